//! `todo` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration from the environment, overridden by flags.
//! - Map subcommands onto `TodoStore` operations over the SQLite backend.
//! - Forward raw `{path, args}` requests through the request boundary.

use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use todo_core::{
    handle_request, FunctionKind, NewTodo, SqliteTodoRepository, StoreConfig, Todo, TodoId,
    TodoListQuery, TodoPatch, TodoStore,
};

#[derive(Parser)]
#[command(name = "todo")]
#[command(about = "Per-user todo store", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite database file (overrides TODO_STORE_DB_PATH).
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides TODO_STORE_LOG_LEVEL).
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Absolute log directory (overrides TODO_STORE_LOG_DIR).
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a todo and print its id
    Create {
        #[arg(long = "user", value_name = "USER_ID")]
        user_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: bool,
    },
    /// Patch a todo; omitted title/description are kept
    Update {
        #[arg(value_name = "ID")]
        id: TodoId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
        completed: bool,
    },
    /// Delete a todo permanently
    Delete {
        #[arg(value_name = "ID")]
        id: TodoId,
    },
    /// List a user's todos, one JSON object per line
    List {
        #[arg(long = "user", value_name = "USER_ID")]
        user_id: String,
        #[arg(long, value_name = "BOOL")]
        completed: Option<bool>,
        #[arg(long)]
        title: Option<String>,
    },
    /// List every todo of a user
    ListAll {
        #[arg(long = "user", value_name = "USER_ID")]
        user_id: String,
    },
    /// Print one todo as JSON
    Show {
        #[arg(value_name = "ID")]
        id: TodoId,
    },
    /// Send a raw function call and print the response envelope
    Call {
        #[arg(value_name = "PATH")]
        path: String,
        #[arg(value_name = "ARGS_JSON", default_value = "{}")]
        args: String,
        /// Invoke as a mutation instead of a query
        #[arg(long)]
        mutation: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = StoreConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }

    config.init_logging()?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        todo_core::core_version()
    );

    let conn = config
        .open_db()
        .map_err(|err| format!("failed to open `{}`: {err}", config.db_path.display()))?;
    let repo = SqliteTodoRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let store = TodoStore::new(repo);

    match cli.command {
        Commands::Create {
            user_id,
            title,
            description,
            completed,
        } => {
            let mut todo = NewTodo::new(user_id, title, completed);
            todo.description = description;
            let id = store.create(todo).map_err(|err| err.to_string())?;
            println!("{id}");
        }
        Commands::Update {
            id,
            title,
            description,
            completed,
        } => {
            let patch = TodoPatch {
                title,
                description,
                is_completed: completed,
            };
            let updated = store.update(id, &patch).map_err(|err| err.to_string())?;
            print_todo(&updated)?;
        }
        Commands::Delete { id } => {
            store.delete(id).map_err(|err| err.to_string())?;
        }
        Commands::List {
            user_id,
            completed,
            title,
        } => {
            let mut query = TodoListQuery::for_user(user_id).with_completion(completed);
            query.title = title;
            for todo in store.query(&query).map_err(|err| err.to_string())? {
                print_todo(&todo)?;
            }
        }
        Commands::ListAll { user_id } => {
            for todo in store.list_all(&user_id).map_err(|err| err.to_string())? {
                print_todo(&todo)?;
            }
        }
        Commands::Show { id } => match store.get(id).map_err(|err| err.to_string())? {
            Some(todo) => print_todo(&todo)?,
            None => return Err(format!("todo not found: {id}")),
        },
        Commands::Call {
            path,
            args,
            mutation,
        } => {
            let kind = if mutation {
                FunctionKind::Mutation
            } else {
                FunctionKind::Query
            };
            let args: serde_json::Value = serde_json::from_str(&args)
                .map_err(|err| format!("ARGS_JSON is not valid JSON: {err}"))?;
            let body = serde_json::json!({ "path": path, "args": args, "format": "json" });
            let response = handle_request(&store, kind, &body.to_string());
            let rendered = serde_json::to_string(&response).map_err(|err| err.to_string())?;
            println!("{rendered}");
            if matches!(response, todo_core::ApiResponse::Error { .. }) {
                return Err("request failed".to_string());
            }
        }
    }

    Ok(())
}

fn print_todo(todo: &Todo) -> Result<(), String> {
    let line = serde_json::to_string(todo).map_err(|err| err.to_string())?;
    println!("{line}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Cli, Commands};
    use clap::{CommandFactory, Parser};
    use todo_core::db::open_db;
    use todo_core::{SqliteTodoRepository, TodoStore};

    fn cli_with_db<'a>(db: &'a str, args: &[&'a str]) -> Cli {
        let mut full = vec!["todo", "--db", db];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn update_requires_explicit_completion() {
        let id = "11111111-2222-4333-8444-555555555555";
        assert!(Cli::try_parse_from(["todo", "update", id, "--title", "x"]).is_err());

        let cli =
            Cli::try_parse_from(["todo", "update", id, "--completed", "false"]).unwrap();
        match cli.command {
            Commands::Update {
                completed, title, ..
            } => {
                assert!(!completed);
                assert!(title.is_none());
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn malformed_id_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["todo", "delete", "nope"]).is_err());
    }

    #[test]
    fn create_list_update_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("todos.db");
        let db = db_path.to_str().unwrap();

        run(cli_with_db(
            db,
            &[
                "create",
                "--user",
                "ashik123",
                "--title",
                "This is a todo",
                "--description",
                "This is a another todo",
            ],
        ))
        .unwrap();

        let conn = open_db(&db_path).unwrap();
        let store = TodoStore::new(SqliteTodoRepository::try_new(&conn).unwrap());
        let listed = store.list_all("ashik123").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "This is a todo");
        assert!(!listed[0].is_completed);
        let id = listed[0].id;
        let id_text = id.to_string();

        run(cli_with_db(db, &["list", "--user", "ashik123", "--completed", "false"])).unwrap();
        run(cli_with_db(db, &["update", id_text.as_str(), "--completed", "true"])).unwrap();
        let updated = store.get(id).unwrap().unwrap();
        assert!(updated.is_completed);
        assert_eq!(updated.title, "This is a todo");

        run(cli_with_db(db, &["delete", id_text.as_str()])).unwrap();
        assert!(store.list_all("ashik123").unwrap().is_empty());

        let err = run(cli_with_db(db, &["show", id_text.as_str()])).unwrap_err();
        assert!(err.contains("not found"));
        let err = run(cli_with_db(db, &["delete", id_text.as_str()])).unwrap_err();
        assert!(err.contains("not found"));
    }
}
