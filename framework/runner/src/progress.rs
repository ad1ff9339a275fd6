use indicatif::{ProgressBar, ProgressStyle};

/// A progress bar over the scenario's declared steps.
pub(crate) fn step_progress(total_steps: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total_steps);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{wide_bar:.cyan/blue}] step {pos}/{len}: {msg}",
        )
        .expect("Failed to set progress style")
        .progress_chars("#>-"),
    );
    pb
}
