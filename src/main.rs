use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;

// Use library instead of local modules
use team_picker::{
    get_all_players, get_available_players, get_player, import_players, leaderboard,
    load_players_csv, logging, open_database, seed_default_players, Config, GameFilter,
    MatchLedger, Player, SqliteLedgerStore, Team, TeamBalancer,
};

fn main() -> Result<()> {
    logging::init("warn");

    let args: Vec<String> = env::args().collect();
    let config = Config::load()?;

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let path = args
                .get(2)
                .context("usage: team-picker import <players.csv>")?;
            run_import(&config, Path::new(path))
        }
        Some("players") => run_players(&config),
        Some("balance") => run_balance(&config, &args[2..]),
        Some("games") => run_games(&config, args.get(2).cloned()),
        Some("stats") => {
            let name = args.get(2).context("usage: team-picker stats <name>")?;
            run_stats(&config, name)
        }
        Some("leaderboard") => run_leaderboard(&config),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("⚽ Team Picker v{}", team_picker::VERSION);
    println!();
    println!("Usage:");
    println!("  team-picker import <players.csv>   Add or replace players from CSV");
    println!("  team-picker players                List the player pool");
    println!("  team-picker balance [name...]      Balance the named (or all available) players");
    println!("  team-picker games [player]         Show game history");
    println!("  team-picker stats <name>           Show one player's record");
    println!("  team-picker leaderboard            Show every player's record");
}

fn open_pool(config: &Config) -> Result<Connection> {
    let conn = open_database(&config.database_path)?;
    if config.seed_default_players {
        seed_default_players(&conn)?;
    }
    Ok(conn)
}

fn open_ledger(config: &Config) -> Result<MatchLedger> {
    let store = SqliteLedgerStore::open(&config.database_path)?;
    Ok(MatchLedger::new(store)?)
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    println!("📂 Loading CSV...");
    let players = load_players_csv(csv_path)?;
    println!("✓ Loaded {} players from CSV", players.len());

    let conn = open_database(&config.database_path)?;
    let written = import_players(&conn, &players)?;
    println!("✓ Saved {} players to {:?}", written, config.database_path);

    Ok(())
}

fn format_player(player: &Player) -> String {
    let a = &player.attributes;
    format!(
        "{:<16} ATT {:>2}  DEF {:>2}  GK {:>2}  EN {:>2}  = {:>2}",
        player.name,
        a.attacking,
        a.defending,
        a.goalkeeping,
        a.energy,
        player.rating()
    )
}

fn run_players(config: &Config) -> Result<()> {
    let conn = open_pool(config)?;
    let players = get_all_players(&conn)?;

    for player in &players {
        let marker = if player.available { "✓" } else { " " };
        println!("{} {}", marker, format_player(player));
    }
    println!("\n{} players", players.len());

    Ok(())
}

fn print_team(team: &Team) {
    let total: u32 = team.players.iter().map(Player::rating).sum();
    println!("\n{} ({} players, rating {})", team.name, team.len(), total);
    for player in &team.players {
        println!("  {}", format_player(player));
    }
}

fn run_balance(config: &Config, names: &[String]) -> Result<()> {
    let conn = open_pool(config)?;

    let players = if names.is_empty() {
        get_available_players(&conn)?
    } else {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match get_player(&conn, name)? {
                Some(player) => selected.push(player),
                None => bail!("Player '{}' not found", name),
            }
        }
        selected
    };

    let balancer = TeamBalancer::with_weights(config.weights);
    let result = balancer.balance(&players)?;

    print_team(&result.red_team);
    print_team(&result.yellow_team);
    println!(
        "\n⚖️  Badness score: {:.2}",
        balancer.badness(&result.red_team, &result.yellow_team)
    );

    Ok(())
}

fn run_games(config: &Config, player: Option<String>) -> Result<()> {
    let ledger = open_ledger(config)?;
    let filter = GameFilter {
        player,
        ..GameFilter::default()
    };

    let games = ledger.list(&filter);
    for recorded in &games {
        let game = &recorded.game;
        println!(
            "#{:<4} {}  Red {} - {} Yellows   [{}] vs [{}]",
            recorded.id,
            game.date,
            game.score.red_score,
            game.score.yellow_score,
            game.red_team.names().join(", "),
            game.yellow_team.names().join(", "),
        );
    }
    println!("\n{} games", games.len());

    Ok(())
}

fn run_stats(config: &Config, name: &str) -> Result<()> {
    let ledger = open_ledger(config)?;
    let stats = ledger.stats_for(name);

    println!("📊 {}", name);
    println!("  Games played: {}", stats.games_played);
    println!("  Wins:         {}", stats.wins);
    println!("  Losses:       {}", stats.losses);
    println!("  Draws:        {}", stats.draws());
    println!("  Win rate:     {}%", stats.win_rate);

    Ok(())
}

fn run_leaderboard(config: &Config) -> Result<()> {
    let ledger = open_ledger(config)?;
    let snapshot = ledger.snapshot();
    let board = leaderboard(snapshot.iter().map(|g| &g.game));

    println!("{:<4} {:<16} {:>5} {:>5} {:>6} {:>8}", "#", "Player", "GP", "W", "L", "Win %");
    for (rank, entry) in board.iter().enumerate() {
        println!(
            "{:<4} {:<16} {:>5} {:>5} {:>6} {:>8.2}",
            rank + 1,
            entry.name,
            entry.stats.games_played,
            entry.stats.wins,
            entry.stats.losses,
            entry.stats.win_rate
        );
    }

    Ok(())
}
