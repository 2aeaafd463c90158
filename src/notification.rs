//! Webhook payload model and envelope decoder.
//!
//! A webhook notification is a three-level graph: [`Notification`] →
//! [`Entry`] (one per business account in the batch) → [`Change`] (one
//! discrete event). Each change carries a `field` discriminator and a
//! polymorphic [`Value`] that may hold envelope-level errors, message
//! status updates, inbound messages, or any mix of the three.
//!
//! Decoding is **total** over structure: every list and sub-object is
//! optional on the wire and decodes to an empty value when absent. The only
//! decode failures are an oversized body (rejected before parsing, see
//! [`MAX_BODY_SIZE`]) and invalid JSON. Tolerating sparse payloads here is
//! what lets the dispatch engine treat "nothing to do" as a successful
//! no-op rather than an error.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::DecodeError;
use crate::{PlatformError, Timestamp};

/// Maximum accepted webhook body size: 3 MiB.
///
/// Bodies larger than this are rejected with
/// [`DecodeError::PayloadTooLarge`] before any JSON parsing happens.
pub const MAX_BODY_SIZE: usize = 3 * 1024 * 1024;

/// Decodes a raw webhook body into a [`Notification`].
///
/// The size guard runs first; a body of exactly [`MAX_BODY_SIZE`] bytes is
/// still parsed.
///
/// # Example
/// ```rust
/// use whatsapp_webhooks_rs::notification::decode;
///
/// let notification = decode(br#"{"object": "whatsapp_business_account", "entry": []}"#).unwrap();
/// assert_eq!(notification.object, "whatsapp_business_account");
/// assert!(notification.entries.is_empty());
/// ```
pub fn decode(body: &[u8]) -> Result<Notification, DecodeError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(DecodeError::PayloadTooLarge {
            size: body.len(),
            limit: MAX_BODY_SIZE,
        });
    }
    Ok(serde_json::from_slice(body)?)
}

/// The top-level webhook envelope.
///
/// Created fresh per inbound HTTP request and discarded after dispatch
/// completes; nothing in the graph is shared across requests.
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct Notification {
    /// The subscribed resource class, e.g. `whatsapp_business_account`.
    #[serde(default)]
    pub object: String,

    /// One entry per originating business account. Changes from different
    /// accounts of the same type may be batched together.
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

/// One business-account-scoped batch of changes within a [`Notification`].
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct Entry {
    /// The WhatsApp Business Account id (or business portfolio id) the
    /// changes belong to.
    #[serde(default)]
    pub id: String,

    /// UNIX timestamp for when the notification was *sent*, not when the
    /// underlying change occurred.
    #[serde(default)]
    pub time: Option<Timestamp>,

    #[serde(default)]
    pub changes: Vec<Change>,
}

/// One discrete event within an [`Entry`].
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct Change {
    /// Names the category of change, e.g. `messages` or
    /// `message_template_status_update`.
    #[serde(default)]
    pub field: String,

    #[serde(default)]
    pub value: Value,
}

/// The polymorphic payload of a [`Change`].
///
/// A value may simultaneously carry envelope-level errors, status updates
/// and inbound messages; all three lists empty is a valid (no-op) value.
/// Business-account change events (template/account updates) use a disjoint
/// schema and surface here only through the `field` discriminator; their
/// extra fields are ignored.
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct Value {
    /// Always `whatsapp` for message events.
    #[serde(default)]
    pub messaging_product: Option<String>,

    /// The business phone identity this change addresses.
    #[serde(default)]
    pub metadata: Option<BusinessMetadata>,

    /// Envelope-level delivery errors.
    #[serde(default)]
    pub errors: Vec<PlatformError>,

    /// Contact info for the customers whose messages appear in `messages`.
    #[serde(default)]
    pub contacts: Vec<Contact>,

    /// Inbound customer messages.
    #[serde(default)]
    pub messages: Vec<MessageRecord>,

    /// Status updates for previously sent messages.
    #[serde(default)]
    pub statuses: Vec<StatusRecord>,
}

/// The business phone number a change was delivered for.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct BusinessMetadata {
    #[serde(default)]
    pub display_phone_number: String,

    /// Id for the phone number. A business replies to a message using this
    /// id, not the display number.
    #[serde(default)]
    pub phone_number_id: String,
}

/// Contact info for a customer who sent a message in this batch.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Contact {
    /// The customer's WhatsApp id. May differ from their phone number.
    #[serde(default)]
    pub wa_id: String,

    #[serde(default)]
    pub profile: Profile,
}

/// A customer profile object.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Profile {
    #[serde(default)]
    pub name: String,
}

/// One inbound customer message, as it appears on the wire.
///
/// Exactly one payload field is populated per type tag; the classifier in
/// [`crate::message`] turns this loosely-shaped record into a typed
/// [`Content`](crate::message::Content) variant.
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct MessageRecord {
    /// The sender's WhatsApp id.
    #[serde(default)]
    pub from: String,

    /// The message id assigned by WhatsApp (`wamid.…`).
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    /// The wire type tag, e.g. `text`, `image`, `interactive`. Absent for
    /// some payloads (location shares have been observed without one).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Reply/forward/product-enquiry context.
    #[serde(default)]
    pub context: Option<ReplyContext>,

    #[serde(default)]
    pub text: Option<Text>,

    #[serde(default)]
    pub image: Option<Media>,

    #[serde(default)]
    pub audio: Option<Media>,

    #[serde(default)]
    pub video: Option<Media>,

    #[serde(default)]
    pub document: Option<Media>,

    #[serde(default)]
    pub sticker: Option<Media>,

    #[serde(default)]
    pub location: Option<Location>,

    /// Shared contact cards (distinct from [`Value::contacts`], which is
    /// sender info).
    #[serde(default)]
    pub contacts: Vec<ContactCard>,

    #[serde(default)]
    pub reaction: Option<Reaction>,

    #[serde(default)]
    pub order: Option<Order>,

    /// Quick-reply button press on a template message.
    #[serde(default)]
    pub button: Option<Button>,

    #[serde(default)]
    pub system: Option<SystemEvent>,

    #[serde(default)]
    pub interactive: Option<InteractiveRecord>,

    /// Present when the message resulted from a click-to-WhatsApp ad.
    #[serde(default)]
    pub referral: Option<Referral>,

    /// Customer identity change payload.
    #[serde(default)]
    pub identity: Option<CustomerIdentity>,

    /// Errors attached to messages of type `unknown`.
    #[serde(default)]
    pub errors: Vec<PlatformError>,
}

/// Text content.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Text {
    #[serde(default)]
    pub body: String,
}

/// An inbound media reference (image, audio, video, document or sticker).
///
/// The media bytes themselves are not in the payload; the `id` is redeemed
/// against the media endpoint by the embedding application.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Media {
    /// WhatsApp media id used to download the content.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default)]
    pub sha256: String,

    #[serde(default)]
    pub caption: Option<String>,

    /// Suggested filename; documents only.
    #[serde(default)]
    pub filename: Option<String>,

    /// Voice-note flag; audio only.
    #[serde(default)]
    pub voice: Option<bool>,

    /// Animated flag; stickers only.
    #[serde(default)]
    pub animated: Option<bool>,
}

/// A shared geographic location.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Location {
    #[serde(default, deserialize_with = "number_or_string")]
    pub latitude: f64,

    #[serde(default, deserialize_with = "number_or_string")]
    pub longitude: f64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

/// An emoji reaction to a previously sent or received message.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Reaction {
    /// The id of the message being reacted to.
    #[serde(default)]
    pub message_id: String,

    /// The reaction emoji. Absent when a previous reaction was removed.
    #[serde(default)]
    pub emoji: Option<String>,
}

/// A product order placed from a catalog.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Order {
    /// Catalog the ordered products originate from.
    #[serde(default)]
    pub catalog_id: String,

    /// Free-text note sent along with the order.
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub product_items: Vec<OrderItem>,
}

/// A single product item within an [`Order`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct OrderItem {
    #[serde(default)]
    pub product_retailer_id: String,

    #[serde(default, deserialize_with = "number_or_string")]
    pub quantity: u32,

    #[serde(default, deserialize_with = "number_or_string")]
    pub item_price: f64,

    /// Currency code, e.g. `USD`.
    #[serde(default)]
    pub currency: String,
}

/// A quick-reply button press on a template message.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Button {
    /// The visible button label.
    #[serde(default)]
    pub text: String,

    /// The developer-defined payload attached to the button.
    #[serde(default)]
    pub payload: String,
}

/// A system event, e.g. a customer changing their phone number.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SystemEvent {
    /// Human-readable description of the event.
    #[serde(default)]
    pub body: String,

    /// The system event type tag, e.g. `customer_changed_number`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// The customer's new WhatsApp id after a number change.
    #[serde(default)]
    pub new_wa_id: Option<String>,

    #[serde(default)]
    pub wa_id: Option<String>,

    #[serde(default)]
    pub identity: Option<String>,
}

/// A customer identity change payload.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct CustomerIdentity {
    #[serde(default)]
    pub acknowledged: Option<bool>,

    #[serde(default)]
    pub created_timestamp: Option<Timestamp>,

    /// Opaque identity hash used to re-verify the customer.
    #[serde(default)]
    pub hash: String,
}

/// The raw `interactive` payload before sub-classification.
///
/// Carries its own `type` discriminator (`list_reply`, `button_reply`,
/// `nfm_reply`, …) alongside at most one populated reply object.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct InteractiveRecord {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub list_reply: Option<ListReply>,

    #[serde(default)]
    pub button_reply: Option<ButtonReply>,

    #[serde(default)]
    pub nfm_reply: Option<FlowReply>,
}

/// A selection from an interactive list message.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ListReply {
    /// The developer-defined row id.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// A press of an interactive reply button.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ButtonReply {
    /// The developer-defined button id.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,
}

/// A completed WhatsApp Flow submission.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct FlowReply {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub body: String,

    /// The flow's result object, JSON-encoded as a string by the platform.
    #[serde(default)]
    pub response_json: String,
}

/// Ad referral metadata attached to a click-to-WhatsApp message.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Referral {
    #[serde(default)]
    pub source_url: String,

    /// `ad` or `post`.
    #[serde(default)]
    pub source_type: String,

    #[serde(default)]
    pub source_id: String,

    #[serde(default)]
    pub headline: Option<String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub video_url: Option<String>,

    #[serde(default)]
    pub thumbnail_url: Option<String>,

    /// Click id for ads-manager attribution.
    #[serde(default)]
    pub ctwa_clid: Option<String>,
}

/// Context linking a message to another message or a product.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ReplyContext {
    /// Sender of the message being replied to.
    #[serde(default)]
    pub from: Option<String>,

    /// Id of the message being replied to.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub forwarded: Option<bool>,

    /// Forwarded more than five times.
    #[serde(default)]
    pub frequently_forwarded: Option<bool>,

    /// The catalog product this message enquires about.
    #[serde(default)]
    pub referred_product: Option<ReferredProduct>,
}

/// A catalog product referenced from a message context.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ReferredProduct {
    #[serde(default)]
    pub catalog_id: String,

    #[serde(default)]
    pub product_retailer_id: String,
}

/// A shared contact card.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactCard {
    #[serde(default)]
    pub name: ContactName,

    #[serde(default)]
    pub phones: Vec<ContactPhone>,

    #[serde(default)]
    pub emails: Vec<ContactEmail>,

    #[serde(default)]
    pub org: Option<ContactOrg>,

    #[serde(default)]
    pub birthday: Option<String>,
}

/// The name block of a [`ContactCard`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactName {
    #[serde(default)]
    pub formatted_name: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,
}

/// One phone number on a [`ContactCard`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactPhone {
    #[serde(default)]
    pub phone: String,

    /// Present when the number is itself on WhatsApp.
    #[serde(default)]
    pub wa_id: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One email address on a [`ContactCard`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactEmail {
    #[serde(default)]
    pub email: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// The organisation block of a [`ContactCard`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ContactOrg {
    #[serde(default)]
    pub company: String,
}

/// A status update for a previously sent message.
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct StatusRecord {
    /// The id of the message the status refers to.
    #[serde(default)]
    pub id: String,

    /// A read status implies delivery; the platform skips the delivered
    /// notification when a message is read near-instantly.
    #[serde(default)]
    pub status: DeliveryStatus,

    #[serde(default)]
    pub timestamp: Option<Timestamp>,

    /// The customer's WhatsApp id.
    #[serde(default)]
    pub recipient_id: Option<String>,

    /// Data originally attached to the message by the business.
    #[serde(default)]
    pub biz_opaque_callback_data: Option<String>,

    #[serde(default)]
    pub conversation: Option<ConversationInfo>,

    #[serde(default)]
    pub pricing: Option<Pricing>,

    /// Platform errors related to this message (e.g. delivery failures).
    #[serde(default)]
    pub errors: Vec<PlatformError>,
}

/// The delivery state reported by a [`StatusRecord`].
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeliveryStatus {
    /// In transit within WhatsApp systems.
    Accepted,
    /// Sent to WhatsApp.
    Sent,
    /// Delivered to the recipient's device.
    Delivered,
    /// Read by the recipient.
    Read,
    /// Failed to send.
    Failed,
    /// A catalog item in the message is unavailable.
    Warning,
    /// Deleted by the sender.
    Deleted,
    /// Any state not enumerated above.
    #[serde(untagged)]
    Other(String),
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

/// Conversation metadata on a status update.
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct ConversationInfo {
    #[serde(default)]
    pub id: String,

    #[serde(deserialize_with = "deserialize_origin", default)]
    pub origin: Option<ConversationOrigin>,

    #[serde(default)]
    pub expiration_timestamp: Option<Timestamp>,
}

/// The billing category of a conversation.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ConversationOrigin {
    Authentication,
    Marketing,
    Utility,
    Service,
    ReferralConversion,
    /// Any category not enumerated above.
    #[serde(untagged)]
    Other(String),
}

/// Pricing metadata on a status update.
#[derive(Deserialize, Clone, Debug, Default)]
#[non_exhaustive]
pub struct Pricing {
    #[serde(default)]
    pub billable: Option<bool>,

    /// Pricing model name, e.g. `CBP`.
    #[serde(default)]
    pub pricing_model: Option<String>,

    #[serde(default)]
    pub category: Option<ConversationOrigin>,
}

// The API quotes numbers inconsistently across payload types (timestamps
// and coordinates have been observed both bare and as strings), so numeric
// fields accept either form.
pub(crate) fn number_or_string<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|err| serde::de::Error::custom(format!("parsing value: {err}"))),
    }
}

fn deserialize_origin<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ConversationOrigin>, D::Error> {
    #[derive(Deserialize)]
    struct Object {
        r#type: ConversationOrigin,
    }

    let helper = <Option<Object>>::deserialize(deserializer)?;
    Ok(helper.map(|o| o.r#type))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Successful deserialization plus a payload-specific probe
    macro_rules! test_payload {
        (|$title:ident| $check:expr => $($payload:tt)*) => {
            #[test]
            fn $title() {
                let notification: Notification =
                    serde_json::from_str(stringify!($($payload)*)).unwrap();
                let check: fn(Notification) = $check;
                check(notification);
            }
        }
    }

    fn first_message(notification: &Notification) -> &MessageRecord {
        &notification.entries[0].changes[0].value.messages[0]
    }

    test_payload! {
        |unknown_message| |n| {
            let msg = first_message(&n);
            assert_eq!(msg.kind, "unknown");
            assert_eq!(msg.errors[0].code, 131051);
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "PHONE_NUMBER",
                      "phone_number_id": "PHONE_NUMBER_ID"
                    },
                    "contacts": [
                      {
                        "profile": {
                          "name": "NAME"
                        },
                        "wa_id": "WHATSAPP_ID"
                      }
                    ],
                    "messages": [
                      {
                        "from": "PHONE_NUMBER",
                        "id": "wamid.ID",
                        "timestamp": "1731617831",
                        "errors": [
                          {
                            "code": 131051,
                            "details": "Message type is not currently supported",
                            "title": "Unsupported message type"
                          }
                        ],
                        "type": "unknown"
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |order_message| |n| {
            let order = first_message(&n).order.as_ref().unwrap();
            assert_eq!(order.catalog_id, "the-catalog_id");
            assert_eq!(order.product_items[0].quantity, 50);
            assert_eq!(order.product_items[0].item_price, 308.0);
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "8856996819413533",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "16505553333",
                      "phone_number_id": "phone-number-id"
                    },
                    "contacts": [
                      {
                        "profile": {
                          "name": "Kerry Fisher"
                        },
                        "wa_id": "16315551234"
                      }
                    ],
                    "messages": [
                      {
                        "from": "16315551234",
                        "id": "wamid.ABGGFlCGg0cvAgo6cHbBhfK5760V",
                        "order": {
                          "catalog_id": "the-catalog_id",
                          "product_items": [
                            {
                              "product_retailer_id": "the-product-SKU-identifier",
                              "quantity": 50,
                              "item_price": 308,
                              "currency": "USD"
                            }
                          ],
                          "text": "text-message-sent-along-with-the-order"
                        },
                        "context": {
                          "from": "16315551234",
                          "id": "wamid.gBGGFlaCGg0xcvAdgmZ9plHrf2Mh-o"
                        },
                        "timestamp": 1603069091,
                        "type": "order"
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |product_enquiry_message| |n| {
            let msg = first_message(&n);
            let product = msg.context.as_ref().unwrap().referred_product.as_ref().unwrap();
            assert_eq!(product.product_retailer_id, "PRODUCT_ID");
            assert_eq!(msg.text.as_ref().unwrap().body, "MESSAGE_TEXT");
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "ID",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "PHONE_NUMBER",
                      "phone_number_id": "PHONE_NUMBER_ID"
                    },
                    "contacts": [
                      {
                        "profile": {
                          "name": "NAME"
                        },
                        "wa_id": "PHONE_NUMBER_ID"
                      }
                    ],
                    "messages": [
                      {
                        "from": "PHONE_NUMBER",
                        "id": "wamid.ID",
                        "text": {
                          "body": "MESSAGE_TEXT"
                        },
                        "context": {
                          "from": "PHONE_NUMBER",
                          "id": "wamid.ID",
                          "referred_product": {
                            "catalog_id": "CATALOG_ID",
                            "product_retailer_id": "PRODUCT_ID"
                          }
                        },
                        "timestamp": 1738499404,
                        "type": "text"
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |interactive_button_reply| |n| {
            let interactive = first_message(&n).interactive.as_ref().unwrap();
            assert_eq!(interactive.kind, "button_reply");
            assert_eq!(
                interactive.button_reply.as_ref().unwrap().id,
                "unique-button-identifier-here"
            );
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
              "changes": [
                {
                  "value": {
                      "messaging_product": "whatsapp",
                      "metadata": {
                           "display_phone_number": "PHONE_NUMBER",
                           "phone_number_id": "PHONE_NUMBER_ID"
                      },
                      "contacts": [
                        {
                          "profile": {
                            "name": "NAME"
                          },
                          "wa_id": "PHONE_NUMBER_ID"
                        }
                      ],
                      "messages": [
                        {
                          "from": "PHONE_NUMBER_ID",
                          "id": "wamid.ID",
                          "timestamp": 17893000,
                          "interactive": {
                            "button_reply": {
                              "id": "unique-button-identifier-here",
                              "title": "button-text"
                            },
                            "type": "button_reply"
                          },
                          "type": "interactive"
                        }
                      ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |interactive_flow_reply| |n| {
            let interactive = first_message(&n).interactive.as_ref().unwrap();
            assert_eq!(interactive.kind, "nfm_reply");
            assert!(interactive.nfm_reply.as_ref().unwrap().response_json.contains("flow_token"));
        } => {
            "object": "whatsapp_business_account",
            "entry": [
            {
                "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
                "changes": [
                {
                    "value":
                    {
                        "messaging_product": "whatsapp",
                        "metadata":
                        {
                            "display_phone_number": "PHONE_NUMBER",
                            "phone_number_id": "PHONE_NUMBER_ID"
                        },
                        "contacts": [
                        {
                            "profile":
                            {
                                "name": "NAME"
                            },
                            "wa_id": "WHATSAPP_ID"
                        }],
                        "messages": [
                        {
                            "context":
                            {
                                "from": "16315558151",
                                "id": "gBGGEiRVVgBPAgm7FUgc73noXjo"
                            },
                            "from": "16315551234",
                            "id": "wamid.ID",
                            "type": "interactive",
                            "interactive":
                            {
                                "type": "nfm_reply",
                                "nfm_reply":
                                {
                                    "name": "flow",
                                    "body": "Sent",
                                    "response_json": "{\"flow_token\": \"FLOW_TOKEN\"}"
                                }
                            },
                            "timestamp": "1731617831"
                        }]
                    },
                    "field": "messages"
                }]
            }]
        }
    }

    test_payload! {
        |location_message_without_type_tag| |n| {
            let msg = first_message(&n);
            assert!(msg.kind.is_empty());
            let location = msg.location.as_ref().unwrap();
            assert_eq!(location.latitude, -233.0);
            assert_eq!(location.name.as_deref(), Some("LOCATION_NAME"));
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "PHONE_NUMBER",
                      "phone_number_id": "PHONE_NUMBER_ID"
                    },
                    "contacts": [
                      {
                        "profile": {
                          "name": "NAME"
                        },
                        "wa_id": "WHATSAPP_ID"
                      }
                    ],
                    "messages": [
                      {
                        "from": "PHONE_NUMBER",
                        "id": "wamid.ID",
                        "timestamp": 1238838484,
                        "location": {
                          "latitude": -233,
                          "longitude": 40,
                          "name": "LOCATION_NAME",
                          "address": "LOCATION_ADDRESS"
                        }
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |sticker_message| |n| {
            let sticker = first_message(&n).sticker.as_ref().unwrap();
            assert_eq!(sticker.mime_type, "image/webp");
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "ID",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "PHONE_NUMBER",
                      "phone_number_id": "PHONE_NUMBER_ID"
                    },
                    "contacts": [
                      {
                        "profile": {
                          "name": "NAME"
                        },
                        "wa_id": "ID"
                      }
                    ],
                    "messages": [
                      {
                        "from": "SENDER_PHONE_NUMBER",
                        "id": "wamid.ID",
                        "timestamp": 179398488,
                        "type": "sticker",
                        "sticker": {
                          "mime_type": "image/webp",
                          "sha256": "HASH",
                          "id": "ID"
                        }
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |reaction_message| |n| {
            let reaction = first_message(&n).reaction.as_ref().unwrap();
            assert_eq!(reaction.emoji.as_deref(), Some("😀"));
            assert_eq!(reaction.message_id, "MESSAGE_ID");
        } => {
            "object": "whatsapp_business_account",
            "entry": [
                {
                    "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
                    "changes": [
                        {
                            "value": {
                                "messaging_product": "whatsapp",
                                "metadata": {
                                    "display_phone_number": "PHONE_NUMBER",
                                    "phone_number_id": "PHONE_NUMBER_ID"
                                },
                                "contacts": [
                                    {
                                        "profile": {
                                            "name": "NAME"
                                        },
                                        "wa_id": "PHONE_NUMBER"
                                    }
                                ],
                                "messages": [
                                    {
                                        "from": "PHONE_NUMBER",
                                        "id": "wamid.ID",
                                        "timestamp": 17494004003,
                                        "reaction": {
                                            "message_id": "MESSAGE_ID",
                                            "emoji": "😀"
                                        },
                                        "type": "reaction"
                                    }
                                ]
                            },
                            "field": "messages"
                        }
                    ]
                }
            ]
        }
    }

    test_payload! {
        |status_update_failed| |n| {
            let status = &n.entries[0].changes[0].value.statuses[0];
            assert_eq!(status.status, DeliveryStatus::Failed);
            assert_eq!(status.errors[0].code, 131050);
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "BUSINESS_PHONE_NUMBER",
                      "phone_number_id": "BUSINESS_PHONE_NUMBER_ID"
                    },
                    "statuses": [
                      {
                        "id": "wamid.ID",
                        "status": "failed",
                        "timestamp": 12999990,
                        "recipient_id": "WHATSAPP_USER_PHONE_NUMBER",
                        "errors": [
                          {
                            "code": 131050,
                            "title": "Unable to deliver the message. This recipient has chosen to stop receiving marketing messages on WhatsApp from your business"
                          }
                        ]
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    test_payload! {
        |status_update_sent_with_pricing| |n| {
            let status = &n.entries[0].changes[0].value.statuses[0];
            assert_eq!(status.status, DeliveryStatus::Sent);
            let pricing = status.pricing.as_ref().unwrap();
            assert_eq!(pricing.billable, Some(true));
            assert_eq!(pricing.category, Some(ConversationOrigin::Marketing));
            assert_eq!(
                status.conversation.as_ref().unwrap().origin,
                Some(ConversationOrigin::Marketing)
            );
        } => {
          "object": "whatsapp_business_account",
          "entry": [
            {
              "id": "WHATSAPP_BUSINESS_ACCOUNT_ID",
              "changes": [
                {
                  "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                      "display_phone_number": "BUSINESS_DISPLAY_PHONE_NUMBER",
                      "phone_number_id": "BUSINESS_PHONE_NUMBER_ID"
                    },
                    "statuses": [
                      {
                        "id": "wamid.ID",
                        "status": "sent",
                        "timestamp": 1289388883,
                        "recipient_id": "WHATSAPP_USER_ID",
                        "conversation": {
                          "id": "CONVERSATION_ID",
                          "origin": {
                            "type": "marketing"
                          }
                        },
                        "pricing": {
                          "billable": true,
                          "pricing_model": "CBP",
                          "category": "marketing"
                        }
                      }
                    ]
                  },
                  "field": "messages"
                }
              ]
            }
          ]
        }
    }

    #[test]
    fn empty_value_decodes_to_no_op() {
        let notification = decode(
            br#"{
                "object": "whatsapp_business_account",
                "entry": [{"id": "ACC", "changes": [{"field": "messages", "value": {}}]}]
            }"#,
        )
        .unwrap();

        let value = &notification.entries[0].changes[0].value;
        assert!(value.errors.is_empty());
        assert!(value.statuses.is_empty());
        assert!(value.messages.is_empty());
    }

    #[test]
    fn missing_substructure_is_not_an_error() {
        // entry without changes, change without value
        let notification = decode(
            br#"{"object": "whatsapp_business_account", "entry": [{"id": "A"}, {"id": "B", "changes": [{"field": "messages"}]}]}"#,
        )
        .unwrap();

        assert_eq!(notification.entries.len(), 2);
        assert!(notification.entries[0].changes.is_empty());
        assert!(notification.entries[1].changes[0].value.messages.is_empty());
    }

    #[test]
    fn oversized_body_rejected_before_parse() {
        // Not even valid JSON: the guard must fire first.
        let body = vec![b'x'; MAX_BODY_SIZE + 1];
        match decode(&body) {
            Err(DecodeError::PayloadTooLarge { size, limit }) => {
                assert_eq!(size, MAX_BODY_SIZE + 1);
                assert_eq!(limit, MAX_BODY_SIZE);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn body_at_limit_is_parsed() {
        // Pad a valid envelope with a filler field to exactly the limit.
        let skeleton = br#"{"object": "whatsapp_business_account", "entry": [], "pad": ""}"#;
        let filler = MAX_BODY_SIZE - skeleton.len();
        let body = format!(
            r#"{{"object": "whatsapp_business_account", "entry": [], "pad": "{}"}}"#,
            "x".repeat(filler)
        );
        assert_eq!(body.len(), MAX_BODY_SIZE);

        let notification = decode(body.as_bytes()).unwrap();
        assert_eq!(notification.object, "whatsapp_business_account");
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        assert!(matches!(decode(b"{not json"), Err(DecodeError::Json(_))));
    }
}
