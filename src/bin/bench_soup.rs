use anyhow::Result;
use hashlife::{set_node_store_cap_log2, Rule, Universe};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hashlife=info")),
        )
        .init();
    set_node_store_cap_log2(20);

    let rule: Rule = std::env::args()
        .nth(1)
        .as_deref()
        .unwrap_or("B3/S23")
        .parse()?;

    let timer = std::time::Instant::now();
    let universe = Universe::random(rule, 9, Some(42));
    println!("Time on building field: {:?}", timer.elapsed());

    let timer = std::time::Instant::now();
    let universe = universe.run(1 << 14);
    println!("Time on big update: {:?}", timer.elapsed());
    println!("{}", universe.statistics());

    let timer = std::time::Instant::now();
    let compacted = universe.compact();
    println!("Time on compaction: {:?}", timer.elapsed());
    assert_eq!(compacted.population(), universe.population());
    println!("Nodes after compaction: {}", compacted.node_count());
    universe.end();
    Ok(())
}
