//! HAR Arena headless runner
//!
//! Plays one match between two controllers at a fixed timestep and reports
//! the outcome. Usage: `har-arena [settings.json]`

use std::process::ExitCode;
use std::sync::Arc;

use har_arena::controller::Match;
use har_arena::sample;
use har_arena::settings::{MatchSettings, PlayerSettings};
use har_arena::sim::{CharacterData, Fighter, GameEvent, HarEvent, SceneData};
use har_arena::DataError;

fn load_fighter(player: &PlayerSettings) -> Result<Fighter, DataError> {
    let character = match &player.character {
        Some(path) => CharacterData::load(path)?,
        None => sample::character()?,
    };
    Ok(Fighter {
        character: Arc::new(character),
        pilot: player.pilot,
    })
}

fn run(settings: &MatchSettings) -> Result<(), DataError> {
    let fighters = [
        load_fighter(&settings.players[0])?,
        load_fighter(&settings.players[1])?,
    ];
    let scene = match &settings.scene {
        Some(path) => SceneData::load(path)?,
        None => sample::scene(),
    };

    let mut m = Match::from_settings(settings, fighters);
    m.state.set_scene(scene);

    let mut hits = [0u32; 2];
    let mut winner = None;
    while m.state.time_ticks() < settings.tick_limit && !m.is_over() {
        for event in m.step(false) {
            match event {
                GameEvent::Har {
                    player,
                    event: HarEvent::LandHit { move_id },
                } => {
                    hits[player as usize] += 1;
                    log::debug!("Player {player} lands move {move_id}");
                }
                GameEvent::Har {
                    player,
                    event: HarEvent::Stun,
                } => log::info!("Player {player} is stunned"),
                GameEvent::Ko { loser } => log::info!("Player {loser} is down"),
                GameEvent::MatchOver { winner: w } => winner = Some(w),
                _ => {}
            }
        }
    }

    println!("Ticks played: {}", m.state.time_ticks());
    for player in 0..2u8 {
        if let Some(h) = m.state.har(player) {
            println!(
                "Player {player}: health {:.0}/{:.0}, hits landed {}",
                h.health, h.stats.health_max, hits[player as usize]
            );
        }
    }
    match winner {
        Some(w) => println!("Winner: player {w}"),
        None => println!("No winner after {} ticks", settings.tick_limit),
    }
    Ok(())
}

fn main() -> ExitCode {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("HAR Arena (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => match MatchSettings::load(&path) {
            Ok(s) => s,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => MatchSettings::default(),
    };

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
