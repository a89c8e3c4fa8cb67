#[cfg(test)]
mod tests {
    use crate::{DecodeError, NewMessage, PresenceStatus, ServerEvent, parse_server_event};

    #[test]
    fn test_parse_online_users() {
        let frame = r#"{"category":"online_users","online_users":[1,2,7]}"#;
        let event = parse_server_event(frame).unwrap();

        assert_eq!(
            event,
            ServerEvent::OnlineUsers {
                online_users: vec![1, 2, 7]
            }
        );
    }

    #[test]
    fn test_parse_status_update() {
        let frame = r#"{"category":"status_update","user_id":4,"status":"offline"}"#;
        let event = parse_server_event(frame).unwrap();

        assert_eq!(
            event,
            ServerEvent::StatusUpdate {
                user_id: 4,
                status: PresenceStatus::Offline
            }
        );
    }

    #[test]
    fn test_parse_typing() {
        let frame = r#"{"category":"typing","chat_id":12,"user_id":3}"#;
        let event = parse_server_event(frame).unwrap();

        assert_eq!(event, ServerEvent::Typing { chat_id: 12, user_id: 3 });
        assert_eq!(event.category(), "typing");
    }

    #[test]
    fn test_parse_new_message_without_file() {
        let frame = r#"{"category":"new_message","chat_id":5,"sender_id":9,"content":"hi"}"#;
        let event = parse_server_event(frame).unwrap();

        assert_eq!(
            event,
            ServerEvent::NewMessage(NewMessage {
                chat_id: 5,
                sender_id: 9,
                content: "hi".to_string(),
                file: None,
            })
        );
    }

    #[test]
    fn test_parse_new_message_with_file() {
        let frame = r#"{"category":"new_message","chat_id":5,"sender_id":9,"content":"","file":"/media/chat/a.png"}"#;
        let event = parse_server_event(frame).unwrap();

        match event {
            ServerEvent::NewMessage(message) => {
                assert_eq!(message.file.as_deref(), Some("/media/chat/a.png"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let frame = r#"{"category":"typing","chat_id":1,"user_id":2,"username":"ana"}"#;
        assert!(parse_server_event(frame).is_ok());
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_server_event("not json {");
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_parse_missing_category() {
        let result = parse_server_event(r#"{"chat_id":1}"#);
        assert!(matches!(result, Err(DecodeError::MissingField(field)) if field == "category"));
    }

    #[test]
    fn test_parse_non_object() {
        let result = parse_server_event("[1,2,3]");
        assert!(matches!(result, Err(DecodeError::MissingField(_))));
    }

    #[test]
    fn test_parse_unknown_category() {
        let result = parse_server_event(r#"{"category":"call_started","chat_id":1}"#);
        assert!(matches!(result, Err(DecodeError::UnknownCategory(c)) if c == "call_started"));
    }

    #[test]
    fn test_parse_wrong_field_type() {
        let result = parse_server_event(r#"{"category":"typing","chat_id":"x","user_id":2}"#);
        assert!(matches!(
            result,
            Err(DecodeError::InvalidFormat { category, .. }) if category == "typing"
        ));
    }
}
