use anyhow::{Context, Result};
use clap::Parser;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kitchen_sim::config::Config;
use kitchen_sim::event::{Event, Severity, Topic, UserRequest};
use kitchen_sim::{bus, dashboard, diag, order_source, pickup, shelf_life, shelf_manager, user_request};

#[derive(Parser)]
#[command(about = "Real-time kitchen-fulfillment simulator")]
struct Args {
    #[arg(long, default_value = "data/orders.json", help = "Orders JSON file path")]
    orders_file: String,

    #[arg(long, default_value_t = 15, help = "Primary shelf capacity per temperature")]
    primary_capacity: usize,

    #[arg(long, default_value_t = 20, help = "Shared overflow shelf capacity")]
    overflow_capacity: usize,

    #[arg(long, default_value_t = 3.25, help = "Order arrival rate, per second")]
    arrival_rate: f64,

    #[arg(long, default_value_t = 2.0, help = "Minimum pickup delay, seconds")]
    pickup_delay_min: f64,

    #[arg(long, default_value_t = 10.0, help = "Maximum pickup delay, seconds")]
    pickup_delay_max: f64,

    #[arg(long, default_value_t = 1000, help = "Per-subscriber bus buffer size")]
    bus_buffer: usize,

    #[arg(long, default_value_t = 1.0, help = "Keep-alive tick period, seconds")]
    keep_alive_period_secs: f64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            primary_capacity: args.primary_capacity,
            overflow_capacity: args.overflow_capacity,
            arrival_rate: args.arrival_rate,
            pickup_delay_min: args.pickup_delay_min,
            pickup_delay_max: args.pickup_delay_max,
            bus_buffer: args.bus_buffer,
            keep_alive_period_secs: args.keep_alive_period_secs,
            orders_file: args.orders_file,
        }
    }
}

/// Allows time for other components to subscribe before the Order Source starts publishing.
const SUBSCRIPTION_HANDSHAKE_DELAY: Duration = Duration::from_millis(1);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::try_parse()?;
    let config: Config = args.into();

    let orders = order_source::load_orders(&config.orders_file)
        .with_context(|| format!("loading orders from {}", config.orders_file))?;

    let bus = Arc::new(bus::EventBus::new(config.bus_buffer));

    let (stop_tx, stop_rx) = crossbeam_channel::unbounded::<()>();
    let incoming_paused = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();

    {
        let bus = bus.clone();
        let config = config.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || shelf_manager::run(bus, &config, stop)));
    }
    {
        let bus = bus.clone();
        let config = config.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || shelf_life::run(bus, &config, stop)));
    }
    {
        let bus = bus.clone();
        let config = config.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || pickup::run(bus, &config, stop)));
    }
    {
        let bus = bus.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || dashboard::run(bus, stop)));
    }
    {
        let bus = bus.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || user_request::run(bus, stop)));
    }
    {
        let bus = bus.clone();
        let paused = incoming_paused.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || {
            order_source::run_pause_watcher(bus, paused, stop)
        }));
    }

    // Let every subscriber above register before the Order Source starts publishing.
    thread::sleep(SUBSCRIPTION_HANDSHAKE_DELAY);

    {
        let bus = bus.clone();
        let config = config.clone();
        let paused = incoming_paused.clone();
        let stop = stop_rx.clone();
        handles.push(thread::spawn(move || {
            order_source::run(bus, &config, orders, paused, stop)
        }));
    }

    // Block the main thread on `quit`, then broadcast shutdown to every task.
    let quit_sub = bus.subscribe(&[Topic::UserRequest]);
    loop {
        match quit_sub.recv() {
            Ok(Event::UserRequest(e)) if e.request == UserRequest::Quit => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }

    diag::diag(&bus, "Bootstrap", Severity::Info, "shutting down");
    drop(stop_tx);
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}
