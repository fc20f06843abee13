//! Self-play simulation.
//!
//! Plays whole games on the practice course with every player choosing
//! random legal actions. Timers go through a [`ManualScheduler`] and are
//! fired synchronously, so a game that would take an hour of wall-clock
//! pacing finishes in milliseconds. Records a summary per game for JSONL
//! output.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::warn;

use crate::board::layouts::practice_course;
use crate::board::{Board, BoardError, Position, ALL_DIRECTIONS};
use crate::config::GameConfig;
use crate::game::{Game, GameEvent, GamePhase};
use crate::player::{PlayerId, REGISTER_COUNT};
use crate::timer::ManualScheduler;

/// Upper bound on driver steps per game, as a guard against a stalled game.
const MAX_STEPS: usize = 200_000;

/// Configuration for self-play runs.
#[derive(Debug, Clone)]
pub struct SelfPlayConfig {
    /// Number of games to play.
    pub num_games: usize,
    /// Players per game (2-6).
    pub players: usize,
    /// Rounds before a game is stopped without a winner.
    pub max_rounds: u32,
    /// Chance that a player leaves registers empty for the selection timer.
    pub laggard_rate: f64,
    /// Chance that a player plays their card instead of waiting out the window.
    pub eager_rate: f64,
    /// Number of parallel threads for concurrent games.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Suppress per-game progress output.
    pub quiet: bool,
    /// Rules for each game. Its seed is replaced per game.
    pub game: GameConfig,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_games: 10,
            players: 4,
            max_rounds: 50,
            laggard_rate: 0.2,
            eager_rate: 0.5,
            threads: 4,
            seed: 0,
            quiet: false,
            game: GameConfig::default(),
        }
    }
}

/// Summary of one finished (or abandoned) game.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub game_seed: u64,
    pub players: usize,
    pub winner: Option<PlayerId>,
    pub rounds: u32,
    pub events: usize,
    pub cards_played: usize,
    pub reboots: usize,
    pub upgrades_bought: usize,
    pub auto_filled: usize,
    /// Pacing time the game would have spent on real timers.
    pub simulated_ms: u64,
    /// Checkpoints reached per player, in join order.
    pub checkpoints: Vec<u8>,
    /// Energy left per player, in join order.
    pub energy: Vec<u32>,
    /// The driver gave up on a game that stopped making progress.
    pub stalled: bool,
}

#[derive(Default)]
struct Tally {
    events: usize,
    cards_played: usize,
    reboots: usize,
    upgrades_bought: usize,
    auto_filled: usize,
}

impl Tally {
    fn count(&mut self, game: &mut Game) {
        for envelope in game.drain_events() {
            self.events += 1;
            match envelope.event {
                GameEvent::CardPlayed { .. } => self.cards_played += 1,
                GameEvent::RobotRebooted { .. } => self.reboots += 1,
                GameEvent::UpgradeBought { .. } => self.upgrades_bought += 1,
                GameEvent::RegistersAutoFilled { .. } => self.auto_filled += 1,
                _ => {}
            }
        }
    }
}

/// Fires the pending timer, advancing simulated time by its delay.
fn fire_timer(game: &mut Game, scheduler: &ManualScheduler) -> bool {
    let Some(token) = game.pending_timer() else {
        return false;
    };
    let delay = scheduler
        .scheduled()
        .iter()
        .rev()
        .find(|(t, _)| *t == token)
        .map(|(_, d)| *d)
        .unwrap_or_default();
    scheduler.advance(delay);
    game.on_timer(token);
    true
}

fn pick_start_points(game: &mut Game, ids: &[PlayerId], rng: &mut SmallRng) {
    let mut free: Vec<Position> = game.board().start_points().to_vec();
    free.shuffle(rng);
    for (id, pos) in ids.iter().zip(free) {
        if let Err(e) = game.select_starting_point(*id, pos) {
            warn!(player = %id, error = %e, "start point rejected");
        }
    }
}

fn resolve_damage_picks(game: &mut Game, rng: &mut SmallRng) {
    let owing: Vec<(PlayerId, u32)> = game
        .players()
        .iter()
        .filter(|p| p.pending_damage > 0)
        .map(|p| (p.id, p.pending_damage))
        .collect();
    for (id, owed) in owing {
        let mut piles = game.damage_piles().clone();
        let mut picks = Vec::new();
        for _ in 0..owed {
            let Some(kind) = piles.pickable().choose(rng).copied() else {
                break;
            };
            piles.take(kind);
            picks.push(kind.name().to_string());
        }
        if picks.len() == owed as usize {
            let _ = game.resolve_damage_pick(id, &picks);
        }
    }
}

fn shop_turn(game: &mut Game, player: PlayerId, rng: &mut SmallRng) {
    let energy = game.player(player).map(|p| p.energy).unwrap_or(0);
    let affordable: Vec<_> = game
        .shop()
        .offered()
        .into_iter()
        .filter(|u| u.cost() <= energy)
        .collect();
    let choice = match affordable.choose(rng) {
        Some(card) if rng.gen_bool(0.5) => Some(card.name()),
        _ => None,
    };
    if let Err(e) = game.buy_upgrade(player, choice) {
        warn!(%player, error = %e, "upgrade choice rejected");
        let _ = game.buy_upgrade(player, None);
    }
}

/// Programs every player that has not chosen yet. The first player always
/// finishes so the selection timer is armed.
fn program_registers(game: &mut Game, config: &SelfPlayConfig, rng: &mut SmallRng) {
    let waiting: Vec<PlayerId> = game
        .players()
        .iter()
        .filter(|p| !p.has_chosen)
        .map(|p| p.id)
        .collect();

    for (i, id) in waiting.into_iter().enumerate() {
        let slots = if i > 0 && rng.gen_bool(config.laggard_rate) {
            rng.gen_range(0..REGISTER_COUNT)
        } else {
            REGISTER_COUNT
        };
        for register in 0..slots {
            let Some(hand) = game.player(id).map(|p| p.hand.clone()) else {
                break;
            };
            let candidates: Vec<_> = hand
                .into_iter()
                .filter(|c| register > 0 || !c.is_again())
                .collect();
            let Some(card) = candidates.choose(rng) else {
                break;
            };
            if game.choose_card_for_register(id, card.name(), register).is_err() {
                break;
            }
            if game.phase() != GamePhase::Programming {
                return;
            }
        }
    }
}

fn activation_step(game: &mut Game, scheduler: &ManualScheduler, rng: &mut SmallRng) -> bool {
    let rebooting: Vec<PlayerId> = game
        .players()
        .iter()
        .filter(|p| game.board().is_rebooting(p.robot.id))
        .map(|p| p.id)
        .collect();
    for id in rebooting {
        if rng.gen_bool(0.3) {
            let dir = ALL_DIRECTIONS[rng.gen_range(0..4)];
            let _ = game.choose_reboot_direction(id, dir);
        }
    }

    if let Some(current) = game.current_player() {
        let register = game.register();
        let card = game
            .player(current)
            .and_then(|p| p.mat.registers.get(register).copied().flatten());
        if let Some(card) = card {
            if rng.gen_bool(0.5) && game.play_queued_card(current, card.name()).is_ok() {
                return true;
            }
        }
    }
    fire_timer(game, scheduler)
}

/// Plays a single game to completion, to `max_rounds`, or until it stalls.
pub fn play_game(
    board: Board,
    config: &SelfPlayConfig,
    game_id: usize,
    rng: &mut SmallRng,
) -> GameRecord {
    let game_seed = rng.gen_range(1..u64::MAX);
    let game_config = GameConfig {
        seed: game_seed,
        ..config.game.clone()
    };
    let scheduler = ManualScheduler::new();
    let mut game = Game::with_standard_effects(board, game_config, Box::new(scheduler.clone()));
    let mut tally = Tally::default();

    let mut ids = Vec::with_capacity(config.players);
    for n in 0..config.players {
        match game.join(&format!("bot-{}", n + 1)) {
            Ok(id) => ids.push(id),
            Err(e) => warn!(game_id, error = %e, "join rejected"),
        }
    }
    if let Err(e) = game.start_game() {
        warn!(game_id, error = %e, "game did not start");
    }
    pick_start_points(&mut game, &ids, rng);

    let mut stalled = false;
    let mut steps = 0;
    loop {
        tally.count(&mut game);
        if game.winner().is_some() || game.round() >= config.max_rounds {
            break;
        }
        steps += 1;
        if steps > MAX_STEPS {
            stalled = true;
            break;
        }

        resolve_damage_picks(&mut game, rng);
        let progressed = match game.phase() {
            GamePhase::Setup => false,
            GamePhase::Upgrade => match game.current_player() {
                Some(player) => {
                    shop_turn(&mut game, player, rng);
                    true
                }
                None => false,
            },
            GamePhase::Programming => {
                program_registers(&mut game, config, rng);
                game.phase() != GamePhase::Programming || fire_timer(&mut game, &scheduler)
            }
            GamePhase::Activation => activation_step(&mut game, &scheduler, rng),
        };
        if !progressed {
            stalled = true;
            break;
        }
    }
    tally.count(&mut game);
    if stalled {
        warn!(game_id, phase = ?game.phase(), round = game.round(), "game stalled");
    }

    GameRecord {
        game_id,
        game_seed,
        players: ids.len(),
        winner: game.winner(),
        rounds: game.round(),
        events: tally.events,
        cards_played: tally.cards_played,
        reboots: tally.reboots,
        upgrades_bought: tally.upgrades_bought,
        auto_filled: tally.auto_filled,
        simulated_ms: duration_ms(scheduler.elapsed()),
        checkpoints: game.players().iter().map(|p| p.checkpoints).collect(),
        energy: game.players().iter().map(|p| p.energy).collect(),
        stalled,
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn outcome(game: &GameRecord) -> String {
    match game.winner {
        Some(w) => format!("{} wins", w),
        None if game.stalled => "stalled".to_string(),
        None => "no winner".to_string(),
    }
}

/// Runs self-play, producing multiple game records.
///
/// When `config.threads > 1`, games are played concurrently using rayon.
pub fn run_self_play(config: &SelfPlayConfig) -> Result<Vec<GameRecord>, BoardError> {
    let mut games = Vec::with_capacity(config.num_games);
    run_self_play_with_callback(config, |game| {
        games.push(game);
    })?;
    Ok(games)
}

/// Runs self-play, calling `on_game` with each completed game record.
pub fn run_self_play_with_callback<F>(config: &SelfPlayConfig, on_game: F) -> Result<(), BoardError>
where
    F: FnMut(GameRecord) + Send,
{
    let board = practice_course()?;
    if config.threads > 1 {
        run_self_play_parallel(config, &board, on_game);
    } else {
        run_self_play_sequential(config, &board, on_game);
    }
    Ok(())
}

fn run_self_play_sequential<F>(config: &SelfPlayConfig, board: &Board, mut on_game: F)
where
    F: FnMut(GameRecord),
{
    let mut rng = if config.seed != 0 {
        SmallRng::seed_from_u64(config.seed)
    } else {
        SmallRng::from_entropy()
    };

    for i in 0..config.num_games {
        let game_start = Instant::now();
        let game = play_game(board.clone(), config, i, &mut rng);
        if !config.quiet {
            eprintln!(
                "Game {}/{}: {} after {} rounds ({:.2}s)",
                i + 1,
                config.num_games,
                outcome(&game),
                game.rounds,
                game_start.elapsed().as_secs_f64(),
            );
        }
        on_game(game);
    }
}

/// Plays games concurrently on a rayon pool and hands them to the callback
/// on the calling thread.
fn run_self_play_parallel<F>(config: &SelfPlayConfig, board: &Board, mut on_game: F)
where
    F: FnMut(GameRecord) + Send,
{
    use rayon::prelude::*;
    use std::sync::mpsc;

    let completed = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<GameRecord>();

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "failed to build thread pool, playing sequentially");
            run_self_play_sequential(config, board, on_game);
            return;
        }
    };

    std::thread::scope(|scope| {
        scope.spawn(|| {
            pool.install(|| {
                (0..config.num_games)
                    .into_par_iter()
                    .for_each_with(tx, |tx, i| {
                        let mut rng = if config.seed != 0 {
                            SmallRng::seed_from_u64(config.seed.wrapping_add(i as u64))
                        } else {
                            SmallRng::from_entropy()
                        };
                        let game_start = Instant::now();
                        let game = play_game(board.clone(), config, i, &mut rng);
                        if !config.quiet {
                            let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                            eprintln!(
                                "Game {}/{}: {} after {} rounds ({:.2}s)",
                                n,
                                config.num_games,
                                outcome(&game),
                                game.rounds,
                                game_start.elapsed().as_secs_f64(),
                            );
                        }
                        let _ = tx.send(game);
                    });
            });
        });

        for game in rx {
            on_game(game);
        }
    });
}

/// Writes game records as JSONL (one JSON object per game, one per line).
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Prints a summary of self-play results to stderr.
pub fn print_summary(games: &[GameRecord]) {
    let total = games.len();
    let won = games.iter().filter(|g| g.winner.is_some()).count();
    let stalled = games.iter().filter(|g| g.stalled).count();
    let rounds: u64 = games.iter().map(|g| u64::from(g.rounds)).sum();
    let reboots: usize = games.iter().map(|g| g.reboots).sum();
    let auto_filled: usize = games.iter().map(|g| g.auto_filled).sum();
    let simulated: u64 = games.iter().map(|g| g.simulated_ms).sum();

    let mut seat_wins = [0usize; 6];
    for game in games {
        if let Some(w) = game.winner {
            if let Some(slot) = seat_wins.get_mut((w.0 as usize).saturating_sub(1)) {
                *slot += 1;
            }
        }
    }

    let per_game = |n: f64| n / total.max(1) as f64;
    eprintln!("=== Self-Play Summary ===");
    eprintln!("Games: {}", total);
    eprintln!("Won: {} ({:.1}%)", won, 100.0 * per_game(won as f64));
    eprintln!("Stalled: {}", stalled);
    eprintln!("Avg rounds/game: {:.1}", per_game(rounds as f64));
    eprintln!("Avg reboots/game: {:.1}", per_game(reboots as f64));
    eprintln!("Avg auto-filled mats/game: {:.1}", per_game(auto_filled as f64));
    eprintln!(
        "Avg simulated time/game: {:.1}s",
        per_game(simulated as f64) / 1000.0
    );
    eprintln!("Wins by seat:");
    for (seat, wins) in seat_wins.iter().enumerate() {
        eprintln!("  P{}: {}", seat + 1, wins);
    }
}
