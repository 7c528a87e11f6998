use serde_json::{json, Value};
use todo_core::api::{GET_ALL_TODOS, GET_TODOS, SAVE_TODO, UPDATE_TODO, DELETE_TODO};
use todo_core::{
    call_function, handle_request, ApiError, ApiResponse, ErrorKind, FunctionCall, FunctionKind,
    MemoryTodoRepository, TodoStore,
};

fn mutation(store: &TodoStore<MemoryTodoRepository>, path: &str, args: Value) -> Value {
    call_function(store, FunctionKind::Mutation, &FunctionCall::new(path, args)).unwrap()
}

fn query(store: &TodoStore<MemoryTodoRepository>, path: &str, args: Value) -> Value {
    call_function(store, FunctionKind::Query, &FunctionCall::new(path, args)).unwrap()
}

fn save(store: &TodoStore<MemoryTodoRepository>, user: &str, title: &str, done: bool) -> String {
    mutation(
        store,
        SAVE_TODO,
        json!({ "user_id": user, "title": title, "is_completed": done }),
    )
    .as_str()
    .unwrap()
    .to_string()
}

#[test]
fn save_then_get_todos_returns_wire_shape() {
    let store = TodoStore::new(MemoryTodoRepository::new());
    let id = mutation(
        &store,
        SAVE_TODO,
        json!({
            "user_id": "ashik123",
            "title": "This is a todo",
            "description": "This is a another todo",
            "is_completed": false
        }),
    );

    let listed = query(&store, GET_TODOS, json!({ "user_id": "ashik123" }));
    let items = listed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id);
    assert_eq!(items[0]["user_id"], "ashik123");
    assert_eq!(items[0]["title"], "This is a todo");
    assert_eq!(items[0]["description"], "This is a another todo");
    assert_eq!(items[0]["is_completed"], false);
    assert!(items[0]["created_at"].is_i64());
}

#[test]
fn absent_description_is_omitted_from_output() {
    let store = TodoStore::new(MemoryTodoRepository::new());
    save(&store, "u", "bare", false);

    let listed = query(&store, GET_ALL_TODOS, json!({ "user_id": "u" }));
    assert!(listed[0].get("description").is_none());
}

#[test]
fn update_and_delete_return_null_markers() {
    let store = TodoStore::new(MemoryTodoRepository::new());
    let id = save(&store, "u", "t", false);

    let updated = mutation(&store, UPDATE_TODO, json!({ "id": id, "is_completed": true }));
    assert_eq!(updated, Value::Null);

    let filtered = query(&store, GET_TODOS, json!({ "user_id": "u", "is_completed": true }));
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["title"], "t");

    assert_eq!(mutation(&store, DELETE_TODO, json!({ "id": id })), Value::Null);
    let remaining = query(&store, GET_ALL_TODOS, json!({ "user_id": "u" }));
    assert!(remaining.as_array().unwrap().is_empty());
}

#[test]
fn update_requires_completion_flag() {
    let store = TodoStore::new(MemoryTodoRepository::new());
    let id = save(&store, "u", "t", false);

    let err = call_function(
        &store,
        FunctionKind::Mutation,
        &FunctionCall::new(UPDATE_TODO, json!({ "id": id, "title": "x" })),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("is_completed"));
}

#[test]
fn owner_cannot_be_reassigned_through_update() {
    let store = TodoStore::new(MemoryTodoRepository::new());
    let id = save(&store, "A", "t", false);

    let err = call_function(
        &store,
        FunctionKind::Mutation,
        &FunctionCall::new(
            UPDATE_TODO,
            json!({ "id": id, "user_id": "B", "is_completed": true }),
        ),
    )
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let for_a = query(&store, GET_ALL_TODOS, json!({ "user_id": "A" }));
    assert_eq!(for_a[0]["is_completed"], false);
}

#[test]
fn malformed_and_missing_ids_are_distinguished() {
    let store = TodoStore::new(MemoryTodoRepository::new());

    let malformed = call_function(
        &store,
        FunctionKind::Mutation,
        &FunctionCall::new(DELETE_TODO, json!({ "id": "not-an-id" })),
    )
    .unwrap_err();
    assert_eq!(malformed.kind(), ErrorKind::Validation);

    let missing = call_function(
        &store,
        FunctionKind::Mutation,
        &FunctionCall::new(
            DELETE_TODO,
            json!({ "id": "11111111-2222-4333-8444-555555555555" }),
        ),
    )
    .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn wrong_types_and_unknown_fields_are_rejected() {
    let store = TodoStore::new(MemoryTodoRepository::new());

    for args in [
        json!({ "user_id": "u", "title": "t", "is_completed": "no" }),
        json!({ "user_id": "u", "title": 5, "is_completed": false }),
        json!({ "title": "t", "is_completed": false }),
        json!({ "user_id": "u", "title": "t", "is_completed": false, "priority": 1 }),
    ] {
        let err = call_function(
            &store,
            FunctionKind::Mutation,
            &FunctionCall::new(SAVE_TODO, args),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(store.repository().is_empty().unwrap());
}

#[test]
fn kind_mismatch_and_unknown_path_are_rejected() {
    let store = TodoStore::new(MemoryTodoRepository::new());

    let as_query = call_function(
        &store,
        FunctionKind::Query,
        &FunctionCall::new(
            SAVE_TODO,
            json!({ "user_id": "u", "title": "t", "is_completed": false }),
        ),
    )
    .unwrap_err();
    assert!(as_query.to_string().contains("is a mutation"));
    assert!(store.repository().is_empty().unwrap());

    let unknown = call_function(
        &store,
        FunctionKind::Query,
        &FunctionCall::new("todoFunc:dropEverything", json!({})),
    )
    .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::Validation);
}

#[test]
fn handle_request_wraps_outcomes_in_envelopes() {
    let store = TodoStore::new(MemoryTodoRepository::new());

    let created = handle_request(
        &store,
        FunctionKind::Mutation,
        r#"{
            "path": "todoFunc:saveTodo",
            "args": { "user_id": "ashik123", "title": "This is a todo", "is_completed": false },
            "format": "json"
        }"#,
    );
    let ApiResponse::Success { value } = &created else {
        panic!("expected success, got {created:?}");
    };
    let wire = serde_json::to_value(&created).unwrap();
    assert_eq!(wire["status"], "success");
    assert_eq!(&wire["value"], value);

    let broken = handle_request(&store, FunctionKind::Mutation, "{ not json");
    let wire = serde_json::to_value(&broken).unwrap();
    assert_eq!(wire["status"], "error");
    assert_eq!(wire["errorKind"], "validation");
    assert!(wire["errorMessage"].as_str().unwrap().contains("malformed request"));

    let bad_format = handle_request(
        &store,
        FunctionKind::Query,
        r#"{ "path": "todoFunc:getAllTodos", "args": { "user_id": "u" }, "format": "xml" }"#,
    );
    assert!(matches!(
        bad_format,
        ApiResponse::Error {
            error_kind: ErrorKind::Validation,
            ..
        }
    ));
}
