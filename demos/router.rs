//! # Example: Router
//!
//! Devices compete for a router with a fixed number of connections.
//! Journal lines go to `log.txt` and are echoed to stdout.
//!
//! ```text
//! cargo run --example router --features logging -- 2 phone:1 laptop:2 desk:3
//! cargo run --example router --features logging            # interactive
//! ```
//!
//! A device category is a menu number (`1` Mobile, `2` Tablet, `3` PC) or a label.
//! Anything else falls back to Mobile.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use routergate::{Category, Config, DeviceSpec, FileSink, LogWriter, Simulation};

fn parse_device(arg: &str) -> DeviceSpec {
    let (name, category) = match arg.split_once(':') {
        Some((name, label)) => (name, category_or_default(label)),
        None => (arg, Category::Mobile),
    };
    DeviceSpec::new(name, category)
}

fn category_or_default(label: &str) -> Category {
    Category::parse(label).unwrap_or_else(|| {
        println!("Invalid Type - defaulting to Mobile..");
        Category::Mobile
    })
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, text: &str) -> anyhow::Result<String> {
    println!("{text}");
    io::stdout().flush()?;
    let line = lines.next().context("unexpected end of input")??;
    Ok(line.trim().to_string())
}

fn interactive() -> anyhow::Result<(usize, Vec<DeviceSpec>)> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let capacity = prompt(&mut lines, "What is the number of WI-FI Connections?")?
        .parse()
        .context("connections must be a number")?;
    let count: usize = prompt(&mut lines, "What is the number of devices Clients want to connect?")?
        .parse()
        .context("device count must be a number")?;

    let mut devices = Vec::with_capacity(count);
    for i in 1..=count {
        let name = prompt(&mut lines, &format!("Enter device {i} Name:"))?;
        let menu = format!("Device {i} Type:\n1) Mobile\n2) Tablet\n3) PC");
        let label = prompt(&mut lines, &menu)?;
        devices.push(DeviceSpec::new(name, category_or_default(&label)));
    }
    Ok((capacity, devices))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (capacity, devices) = match args.split_first() {
        Some((cap, rest)) => (
            cap.parse().context("first argument must be the number of connections")?,
            rest.iter().map(|a| parse_device(a)).collect(),
        ),
        None => interactive()?,
    };

    let sim = Simulation::builder(Config::with_capacity(capacity))
        .with_sink(Arc::new(FileSink::new("log.txt")))
        .with_subscriber(Arc::new(LogWriter::new()))
        .build()?;

    let report = sim.run(devices).await?;
    println!(
        "done: {} of {} devices completed",
        report.completed(),
        report.workers.len()
    );
    Ok(())
}
