// Common test utilities and fixtures for the integration suite

#[allow(unused_imports)]
pub use flowx_test::{delayed, tokio_spawner, Gauge, Recorder};

/// Dependency-graph tasks declared with `#[inject]`.
#[allow(dead_code)]
pub mod tasks {
    use flowx::inject;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Row {
        pub id: u32,
        pub amount: u64,
    }

    #[inject]
    pub async fn rows() -> Result<Vec<Row>, String> {
        Ok(vec![
            Row { id: 1, amount: 40 },
            Row { id: 2, amount: 2 },
        ])
    }

    #[inject]
    pub fn tax_rate() -> Result<u64, String> {
        Ok(10)
    }

    #[inject]
    pub async fn total(rows: &Vec<Row>) -> Result<u64, String> {
        Ok(rows.iter().map(|row| row.amount).sum())
    }

    #[inject]
    pub async fn tax(total: u64, tax_rate: &u64) -> Result<u64, String> {
        Ok(total * tax_rate / 100)
    }

    #[inject]
    pub async fn report(total: &u64, tax: &u64) -> Result<String, String> {
        Ok(format!("total={total} tax={tax}"))
    }

    #[inject]
    pub async fn broken() -> Result<u64, String> {
        Err("upstream unavailable".to_string())
    }
}
