use super::*;
use serde_json::json;

#[test]
fn hello_round_trips_as_tuple() {
    let req = Request::Hello {
        proto_version: 1,
        auth_token: "deadbeef".to_string(),
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value, json!(["HELLO", 1, "deadbeef"]));

    let back = Request::from_value(value).unwrap();
    assert_eq!(back, req);
}

#[test]
fn call_round_trips_with_args_and_kwargs() {
    let mut kwargs = Map::new();
    kwargs.insert("step".to_string(), json!(1));
    let req = Request::Call {
        method: "inc".to_string(),
        args: vec![json!(5)],
        kwargs: kwargs.clone(),
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value, json!(["CALL", "inc", [5], {"step": 1}]));
    assert_eq!(Request::from_value(value).unwrap(), req);
}

#[test]
fn unknown_tag_is_soft_error_not_panic() {
    let value = json!(["FROBNICATE", 1]);
    let err = Request::from_value(value).unwrap_err();
    assert_eq!(err.0, "unknown message type: FROBNICATE");
}

#[test]
fn non_array_request_is_rejected() {
    let value = json!({"not": "a tuple"});
    assert!(Request::from_value(value).is_err());
}

#[test]
fn hello_ok_reply_matches_spec_shape() {
    let reply = Reply::ok(vec![json!(42), json!({"codec": "json"})]);
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value, json!(["OK", 42, {"codec": "json"}]));
}

#[test]
fn err_reply_round_trips() {
    let reply = Reply::err("private methods are not allowed");
    let value = serde_json::to_value(&reply).unwrap();
    let back: Reply = serde_json::from_value(value).unwrap();
    assert_eq!(back, reply);
    assert!(!back.is_ok());
}

#[test]
fn shutdown_reply_field_is_accessible() {
    let reply = Reply::ok(vec![json!({"shutdown": true})]);
    assert_eq!(reply.first_ok_field(), Some(&json!({"shutdown": true})));
}
