// --- CONSTANTS ---
#[allow(dead_code)]
pub const WABA_ID: &str = "987654321098765";
#[allow(dead_code)]
pub const PHONE_ID: &str = "phone_id_222";
#[allow(dead_code)]
pub const DISPLAY_NUMBER: &str = "16505551111";
#[allow(dead_code)]
pub const SENDER_WA_ID: &str = "16315551234";
#[allow(dead_code)]
pub const SENDER_NAME: &str = "Kerry Fisher";
#[allow(dead_code)]
pub const VERIFY_TOKEN: &str = "very_secret_token";
#[allow(dead_code)]
pub const APP_SECRET: &str = "a1b2c3d4e5f6";

// --- PAYLOAD BUILDERS ---

use serde_json::{json, Value};
use whatsapp_webhooks_rs::Notification;

/// A `text` message record with the given message id and body.
#[allow(dead_code)]
pub fn text_message(id: &str, body: &str) -> Value {
    json!({
        "from": SENDER_WA_ID,
        "id": id,
        "timestamp": "1731617831",
        "type": "text",
        "text": { "body": body }
    })
}

/// A `messages` change wrapping the given message records.
#[allow(dead_code)]
pub fn messages_change(messages: Vec<Value>) -> Value {
    json!({
        "field": "messages",
        "value": {
            "messaging_product": "whatsapp",
            "metadata": {
                "display_phone_number": DISPLAY_NUMBER,
                "phone_number_id": PHONE_ID
            },
            "contacts": [
                { "profile": { "name": SENDER_NAME }, "wa_id": SENDER_WA_ID }
            ],
            "messages": messages
        }
    })
}

#[allow(dead_code)]
pub fn entry(changes: Vec<Value>) -> Value {
    json!({
        "id": WABA_ID,
        "time": 1731617831,
        "changes": changes
    })
}

#[allow(dead_code)]
pub fn notification_json(entries: Vec<Value>) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": entries
    })
}

/// Runs a built JSON payload through the real decoder.
#[allow(dead_code)]
pub fn decode_notification(payload: Value) -> Notification {
    whatsapp_webhooks_rs::decode(&serde_json::to_vec(&payload).unwrap()).unwrap()
}
