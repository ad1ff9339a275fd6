use tabled::Tabled;

#[derive(Tabled)]
pub struct OperationRow {
    pub operation_id: String,
    pub avg_time_ms: String,
    pub min_time_ms: String,
    pub max_time_ms: String,
    pub total_operations: usize,
    pub errors: usize,
    pub total_duration_ms: String,
}

pub fn float2(n: f64) -> String {
    format!("{:.2}", n)
}
