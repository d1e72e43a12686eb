//! Simulate a warrior against a goblin and narrate the fight.
//!
//! Run with: `cargo run -p blades-core --example simulate_duel -- [seed]`
//! Set `RUST_LOG=blades_core=debug` to see every roll.

use blades_core::ai::{Aggressive, Tactical};
use blades_core::testing::{sample_goblin, sample_warrior};
use blades_core::{CombatEngine, Encounter, EventKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blades_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(42);

    let mut engine = CombatEngine::seeded(seed);
    engine
        .events_mut()
        .subscribe(EventKind::FinishingBlow, |event| {
            println!(
                "  >> Finishing blow! {} hits {} for {} damage",
                event.get_str("attacker").unwrap_or("?"),
                event.get_str("defender").unwrap_or("?"),
                event.get_i64("damage").unwrap_or(0)
            );
            Ok(())
        });
    engine
        .events_mut()
        .subscribe(EventKind::CombatantDied, |event| {
            println!("  >> {} falls", event.get_str("combatant").unwrap_or("?"));
            Ok(())
        });

    println!("=== Ether Blades duel (seed {seed}) ===\n");

    let mut encounter = Encounter::new(engine)
        .with_combatant(sample_warrior("Aldric"), Box::new(Tactical))
        .with_combatant(sample_goblin("Goblin"), Box::new(Aggressive));
    let report = encounter.run()?;

    if let Some(state) = encounter.engine().state() {
        for (turn, result) in state.history.iter().enumerate() {
            println!("Turn {:>2}: {}", turn + 1, result);
        }
        println!("\n{state}");
    }

    match report.winner {
        Some(winner) => println!(
            "{winner} wins after {} rounds and {} exchanges",
            report.rounds, report.exchanges
        ),
        None if report.timed_out => println!("No winner after {} rounds", report.rounds),
        None => println!("Nobody is left standing"),
    }
    Ok(())
}
