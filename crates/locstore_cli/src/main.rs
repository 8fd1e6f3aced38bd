//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `locstore_core` linkage without the Flutter/FFI runtime.
//! - Optionally dump a location database: `locstore_cli [db_path]`.

use locstore_core::db::open_db;
use locstore_core::{LocationRepository, SqliteLocationRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("locstore_core ping={}", locstore_core::ping());
    println!("locstore_core version={}", locstore_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match dump_locations(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("locstore_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn dump_locations(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = open_db(db_path)?;
    let repo = SqliteLocationRepository::try_new(&mut conn)?;

    println!("count={}", repo.count()?);
    for location in repo.list_all()? {
        let id = location.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!("{} {} {}", id, location.formatted_id(), location.city);
    }
    Ok(())
}
