//! Rules command implementation

use anyhow::Result;

use mission_board::Config;
use mission_board::domain::{GROUP_POINTS, GROUP_SIZE, group_range, required_points};

/// Print the scoring table and reward ladder for the loaded config
pub fn rules_command(config: &Config) -> Result<()> {
    let ladder = config.ladder()?;

    println!(
        "Missions per group: {} ({} points per group)\n",
        GROUP_SIZE, GROUP_POINTS
    );
    println!("  Position  Points");
    for position in 1..=GROUP_SIZE {
        println!("  {:>8}  {}", position, required_points(position));
    }

    println!("\nGroups ({}):\n", config.board.group_count);
    for group in 0..config.board.group_count {
        let range = group_range(group);
        println!(
            "  #{} missions {}-{}  reward at {} points",
            group + 1,
            range.start(),
            range.end(),
            ladder.threshold(group).unwrap_or(0)
        );
    }

    println!(
        "\nTiming: reveal {}ms, counter tick {}ms, reward reveal {}ms",
        config.timing.mission_reveal_ms, config.timing.reward_tick_ms, config.timing.reward_reveal_ms
    );
    Ok(())
}
