//! Interactive shell for managing stations and bindings.
//!
//! `create`/`play`/`delete` manage the local account's stations;
//! `bind`/`bindall`/`unbind`/`binds` point the game's built-in stations at
//! them. Every mutation goes to the backend first and the local cache is
//! updated only after the backend accepted it, so a refused command leaves
//! the shell's view unchanged.

use crossfade_api::ApiClient;
use crossfade_core::{
    station_by_name, Binding, InGameStation, SharedState, Station, StationKind, IN_GAME_STATIONS,
};
use dialoguer::Input;

/// Runs the shell until `exit` or end of input.
pub async fn run(state: SharedState, api: ApiClient) {
    loop {
        let line = match read_line().await {
            Some(line) => line,
            None => break,
        };

        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            continue;
        };

        match command {
            "create" => create(&state, &api, args).await,
            "play" => play(&state, &api, args).await,
            "delete" => delete(&state, &api, args).await,
            "bind" => bind(&state, &api, args).await,
            "bindall" => bind_all(&state, &api, args).await,
            "unbind" => unbind(&state, &api, args).await,
            "binds" => binds(&state),
            "help" => help(),
            "exit" | "quit" => break,
            _ => println!("Unknown command (try 'help')"),
        }
    }
}

/// Reads one line off the async threads. `None` ends the shell.
async fn read_line() -> Option<String> {
    let input = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("crossfade")
            .allow_empty(true)
            .interact_text()
    })
    .await;

    match input {
        Ok(Ok(line)) => Some(line),
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "Shell input closed");
            None
        }
        Err(_) => None,
    }
}

/// Station ids end up as URL path segments; keep them to a safe charset.
fn valid_station_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn create(state: &SharedState, api: &ApiClient, args: &[&str]) {
    if args.len() < 2 {
        println!("Usage: create <id> <type>");
        return;
    }
    let id = args[0];

    if !valid_station_id(id) {
        println!("Station ids may only use letters, numbers, '-' and '_'");
        return;
    }

    if state.lock().local_station(id).is_some() {
        println!("Station already exists");
        return;
    }

    let Ok(kind) = args[1].parse::<StationKind>() else {
        println!("Unknown station type (static or stream)");
        return;
    };

    let source = match kind {
        StationKind::Static => {
            if args.len() < 3 {
                println!("Usage: create <id> static <folder>");
                return;
            }
            args[2..].join(" ")
        }
        StationKind::Stream => String::new(),
    };

    let station = Station {
        id: id.to_string(),
        kind,
        source,
    };

    if let Err(err) = api.create_station(&station).await {
        println!("{err}");
        return;
    }

    state.lock().upsert_station(station);
    println!("Successfully created station {id}");
}

async fn play(state: &SharedState, api: &ApiClient, args: &[&str]) {
    if args.len() < 2 {
        println!("Usage: play <station> <source>");
        return;
    }
    let id = args[0];
    let source = args[1..].join(" ");

    let Some(station) = state.lock().local_station(id) else {
        println!("Station not found");
        return;
    };

    let result = match station.kind {
        // A static station "plays" by replacing its source folder.
        StationKind::Static => {
            let replacement = Station {
                id: station.id.clone(),
                kind: station.kind,
                source: source.clone(),
            };
            let result = api.create_station(&replacement).await;
            if result.is_ok() {
                state.lock().upsert_station(replacement);
            }
            result
        }
        StationKind::Stream => api.queue_source(id, &source).await,
    };

    match result {
        Ok(()) => println!("{id} is now playing {source}"),
        Err(err) => println!("{err}"),
    }
}

async fn delete(state: &SharedState, api: &ApiClient, args: &[&str]) {
    if args.is_empty() {
        println!("Usage: delete <station>");
        return;
    }
    let id = args[0];

    if state.lock().local_station(id).is_none() {
        println!("Station not found");
        return;
    }

    if let Err(err) = api.delete_station(id).await {
        println!("{err}");
        return;
    }

    state.lock().remove_station(id);
    println!("Deleted station {id}");
}

async fn bind(state: &SharedState, api: &ApiClient, args: &[&str]) {
    if args.len() < 2 {
        println!("Usage: bind <station> <in-game station>");
        return;
    }
    let id = args[0];
    let name = args[1..].join(" ");

    if state.lock().local_station(id).is_none() {
        println!("Invalid station");
        return;
    }

    let Some(in_game) = station_by_name(&name) else {
        println!("In-game station not found");
        return;
    };

    bind_station(state, api, id, in_game).await;
}

async fn bind_all(state: &SharedState, api: &ApiClient, args: &[&str]) {
    if args.is_empty() {
        println!("Usage: bindall <station>");
        return;
    }
    let id = args[0];

    if state.lock().local_station(id).is_none() {
        println!("Invalid station");
        return;
    }

    for in_game in IN_GAME_STATIONS {
        if !bind_station(state, api, id, in_game).await {
            return;
        }
    }
}

/// Creates one binding on the backend and caches it. Returns `false` when
/// the backend refused.
async fn bind_station(
    state: &SharedState,
    api: &ApiClient,
    station_id: &str,
    in_game: &InGameStation,
) -> bool {
    let binding = Binding {
        id: in_game.id.to_string(),
        station_user: api.account_id().to_string(),
        station_id: station_id.to_string(),
    };

    if let Err(err) = api.create_binding(&binding).await {
        println!("{err}");
        return false;
    }

    state.lock().upsert_binding(binding);
    println!("Bound station {station_id} to {}", in_game.name);
    true
}

async fn unbind(state: &SharedState, api: &ApiClient, args: &[&str]) {
    if args.is_empty() {
        println!("Usage: unbind <in-game station>");
        return;
    }
    let name = args.join(" ");

    let Some(in_game) = station_by_name(&name) else {
        println!("In-game station not found");
        return;
    };

    if let Err(err) = api.delete_binding(in_game.id).await {
        println!("{err}");
        return;
    }

    state.lock().remove_binding(in_game.id);
    println!("Unbound station {}", in_game.name);
}

fn binds(state: &SharedState) {
    let state = state.lock();
    for in_game in IN_GAME_STATIONS {
        match state.local_binding(in_game.id) {
            Some(binding) => println!("{} -> {}", in_game.name, binding.station_id),
            None => println!("{} -> Default", in_game.name),
        }
    }
}

fn help() {
    println!("Commands:");
    println!("  create <id> <static|stream> [folder]  Create a station");
    println!("  play <station> <source>               Play a source on a station");
    println!("  delete <station>                      Delete a station");
    println!("  bind <station> <in-game station>      Bind a station to an in-game station");
    println!("  bindall <station>                     Bind a station to every in-game station");
    println!("  unbind <in-game station>              Unbind an in-game station");
    println!("  binds                                 List in-game station bindings");
    println!("  exit                                  Quit and restore the system proxy");
}
