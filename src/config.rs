//! Runtime tunables for the simulator, with their defaults. The CLI layer in `main.rs` overrides
//! these via `clap`.

#[derive(Debug, Clone)]
pub struct Config {
    pub primary_capacity: usize,
    pub overflow_capacity: usize,
    pub arrival_rate: f64,
    pub pickup_delay_min: f64,
    pub pickup_delay_max: f64,
    pub bus_buffer: usize,
    pub keep_alive_period_secs: f64,
    pub orders_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_capacity: 15,
            overflow_capacity: 20,
            arrival_rate: 3.25,
            pickup_delay_min: 2.0,
            pickup_delay_max: 10.0,
            bus_buffer: 1000,
            keep_alive_period_secs: 1.0,
            orders_file: "data/orders.json".to_string(),
        }
    }
}
