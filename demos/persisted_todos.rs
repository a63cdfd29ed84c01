//! Todo list whose items survive restarts.
//!
//! Run it twice: the second run starts with the todos added by the first.
//!
//! ```text
//! RUST_LOG=persist_machine=debug cargo run --example persisted_todos
//! ```

use persist_machine::{
    Action, FileStorage, PersistConfig, PersistMachine, SliceConfig, Store, Structure,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct TodoItem {
    title: String,
    completed: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Todos {
    items: Vec<TodoItem>,
    // Not persisted: only `items` is listed in the structure.
    draft: String,
}

#[derive(Clone, Debug, Default, Serialize)]
struct AppState {
    todos: Todos,
}

fn reducer(state: &mut AppState, action: &Action) {
    match action.kind.as_str() {
        "LOAD_TODOS" => {
            if let Some(items) = action.payload.get("items") {
                state.todos.items = serde_json::from_value(items.clone()).unwrap_or_default();
            }
        }
        "ADD_TODO" => {
            if let Some(title) = action.payload.as_str() {
                state.todos.items.push(TodoItem {
                    title: title.to_string(),
                    completed: false,
                });
            }
        }
        "TOGGLE_TODO" => {
            if let Some(item) = action
                .payload
                .as_u64()
                .and_then(|i| state.todos.items.get_mut(i as usize))
            {
                item.completed = !item.completed;
            }
        }
        "SET_DRAFT" => {
            state.todos.draft = action.payload.as_str().unwrap_or_default().to_string();
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> persist_machine::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Persisted Todos ===\n");

    let dir = std::env::temp_dir().join("persist-machine-demo");
    let structure = Structure::new().slice("todos", SliceConfig::new("@todos").values(["items"]));
    let machine = PersistMachine::new(
        structure,
        FileStorage::new(&dir),
        PersistConfig::default().with_debug(true),
    )?;

    let store = Store::new(AppState::default(), reducer).with_middleware(machine.middleware());
    let handle = machine.run(&store);

    println!("1. Loading todos from {}", dir.display());
    store.dispatch(Action::new("LOAD_TODOS")).await?;
    let loaded = store.read(|state| state.todos.items.len());
    println!("   Loaded {} todo(s)", loaded);

    println!("\n2. Adding a todo");
    store
        .dispatch(Action::with_payload("ADD_TODO", json!(format!("Todo #{}", loaded + 1))))
        .await?;

    println!("\n3. Editing the draft (not persisted)");
    store
        .dispatch(Action::with_payload("SET_DRAFT", json!("half-typed")))
        .await?;

    println!("\n4. Completing the first todo");
    store.dispatch(Action::with_payload("TOGGLE_TODO", json!(0))).await?;

    println!("\n5. Current todos:");
    store.read(|state| {
        for todo in &state.todos.items {
            let status = if todo.completed { "✓" } else { " " };
            println!("   [{}] {}", status, todo.title);
        }
    });

    handle.shutdown().await?;
    println!("\n✓ Saved. Run again to see them reloaded.");
    Ok(())
}
