use std::{error::Error, io};

use clap::{Parser, ValueEnum};
use rusqlite::Connection;

use ledgerly::{
    models::{PasswordHash, ValidatedPassword},
    stores::{
        JsonFileStore, UserStore,
        sqlite::{SqliteUserStore, initialize},
    },
};

/// A utility for registering a new user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The storage backend to register the user in.
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    backend: Backend,

    /// File path to the application SQLite database.
    #[arg(long, default_value = "ledgerly.db")]
    db_path: String,

    /// File path to the JSON store file.
    #[arg(long, default_value = "ledgerly.json")]
    data_path: String,

    /// The name the new user will log in with.
    #[arg(long)]
    username: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Sqlite,
    Json,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let password_hash = match get_password_hash() {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    let user = match args.backend {
        Backend::Sqlite => {
            let connection = Connection::open(&args.db_path)?;
            initialize(&connection)?;

            SqliteUserStore::new(std::sync::Arc::new(std::sync::Mutex::new(connection)))
                .create(&args.username, password_hash)?
        }
        Backend::Json => {
            JsonFileStore::open(&args.data_path)?.create(&args.username, password_hash)?
        }
    };

    println!("Created user {} with ID {}", user.username, user.id);

    Ok(())
}

fn get_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = match rpassword::prompt_password("Enter a password: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if let Err(error) = ValidatedPassword::new(&first_password) {
            print_error(error);
            continue;
        }

        let second_password = match rpassword::prompt_password("Enter the same password again: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::from_raw_password(&first_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
                continue;
            }
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
