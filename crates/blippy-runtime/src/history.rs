//! History projection — stored messages to provider input items.
//!
//! The provider's continued-conversation contract requires each prior tool
//! execution as a `function_call`/`function_call_output` pair and one
//! assistant `message` per turn even when the stored message interleaved
//! text and tool items.

use blippy_core::{plain_text, Item};
use blippy_openrouter::Input;
use blippy_store::rows::MessageRow;
use blippy_tools::encode_tool_name;

/// Convert a stored message into provider input items.
#[must_use]
pub fn build_history_inputs(msg: &MessageRow) -> Vec<Input> {
    let items: Vec<Item> = if msg.items_json.is_empty() || msg.items_json == "[]" {
        Vec::new()
    } else {
        serde_json::from_str(&msg.items_json).unwrap_or_default()
    };

    match msg.role.as_str() {
        "user" => vec![Input::user_message(plain_text(&items))],
        "assistant" => {
            let mut inputs = Vec::new();
            for (index, item) in items.iter().enumerate() {
                if let Item::ToolExecution { name, input, result, id, call_id } = item {
                    // IDs missing from older rows are synthesized
                    // deterministically from the message id and item index so
                    // the pairing is stable across requests.
                    let call_id = match call_id.as_deref() {
                        Some(id) if !id.is_empty() => id.to_owned(),
                        _ => format!("call_{}_{index}", msg.id),
                    };
                    let fc_id = match id.as_deref() {
                        Some(id) if !id.is_empty() => id.to_owned(),
                        _ => format!("fc_{}_{index}", msg.id),
                    };
                    inputs.push(Input::function_call(
                        fc_id,
                        &call_id,
                        encode_tool_name(name),
                        input,
                    ));
                    inputs.push(Input::function_call_output(
                        format!("fc_out_{}_{index}", msg.id),
                        &call_id,
                        result,
                    ));
                }
            }

            // Text spans coalesce into a single completed assistant message,
            // appended after the call/output pairs.
            let text = plain_text(&items);
            if !text.is_empty() {
                inputs.push(Input::assistant_message(&msg.id, text));
            }

            inputs
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: &str, items_json: &str) -> MessageRow {
        MessageRow {
            id: "msg-1".into(),
            conversation_id: "conv-1".into(),
            role: role.into(),
            items_json: items_json.into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn user_message_becomes_single_input() {
        let msg = message("user", r#"[{"type":"text","text":"hello"}]"#);
        let inputs = build_history_inputs(&msg);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].input_type, "message");
        assert_eq!(inputs[0].role, "user");
        assert_eq!(inputs[0].content[0].text, "hello");
    }

    #[test]
    fn assistant_tool_execution_becomes_call_output_pair() {
        let msg = message(
            "assistant",
            r#"[{"type":"tool_execution","name":"notify:ops","input":"{}","result":"sent","id":"fc_9","call_id":"call_9"},{"type":"text","text":"Done."}]"#,
        );
        let inputs = build_history_inputs(&msg);
        assert_eq!(inputs.len(), 3);

        assert_eq!(inputs[0].input_type, "function_call");
        assert_eq!(inputs[0].id, "fc_9");
        assert_eq!(inputs[0].call_id, "call_9");
        assert_eq!(inputs[0].name, "notify__ops", "names are re-encoded for transport");

        assert_eq!(inputs[1].input_type, "function_call_output");
        assert_eq!(inputs[1].call_id, "call_9");
        assert_eq!(inputs[1].output, "sent");

        assert_eq!(inputs[2].input_type, "message");
        assert_eq!(inputs[2].role, "assistant");
        assert_eq!(inputs[2].status, "completed");
        assert_eq!(inputs[2].content[0].text, "Done.");
    }

    #[test]
    fn missing_ids_are_synthesized_deterministically() {
        let msg = message(
            "assistant",
            r#"[{"type":"tool_execution","name":"fetch_url","input":"{}","result":"ok"}]"#,
        );
        let first = build_history_inputs(&msg);
        let second = build_history_inputs(&msg);

        assert_eq!(first[0].call_id, "call_msg-1_0");
        assert_eq!(first[0].id, "fc_msg-1_0");
        assert_eq!(first[1].id, "fc_out_msg-1_0");
        assert_eq!(first, second);
    }

    #[test]
    fn assistant_text_spans_coalesce() {
        let msg = message(
            "assistant",
            r#"[{"type":"text","text":"part one"},{"type":"tool_execution","name":"t","input":"{}","result":"r","call_id":"c1"},{"type":"text","text":"part two"}]"#,
        );
        let inputs = build_history_inputs(&msg);
        // pair first, then one coalesced assistant message
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[2].content[0].text, "part one\n\npart two");
    }

    #[test]
    fn empty_items_produce_nothing_for_assistant() {
        let msg = message("assistant", "[]");
        assert!(build_history_inputs(&msg).is_empty());
    }

    #[test]
    fn unknown_role_is_ignored() {
        let msg = message("system", r#"[{"type":"text","text":"x"}]"#);
        assert!(build_history_inputs(&msg).is_empty());
    }
}
