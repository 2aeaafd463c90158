//! Message classification.
//!
//! The Cloud API describes an inbound message as a flat record with a
//! `type` tag and a pile of optional payload fields. The tag alone is not
//! enough to route a message: a `text` message with a `referral` object is
//! really an ad click-through, a `text` message whose context names a
//! `referred_product` is a product enquiry, and some payloads (location
//! shares, contact cards, identity changes) arrive with no usable tag at
//! all. This module owns that disambiguation.
//!
//! [`MessageType`] is the pure tag registry; [`classify`] applies the
//! full, priority-ordered rules and produces exactly one [`Content`]
//! variant — or an [`UnsupportedMessageType`] error the dispatch engine
//! records as recoverable.

use serde::Deserialize;

use crate::error::UnsupportedMessageType;
use crate::notification::{
    Button, ContactCard, CustomerIdentity, InteractiveRecord, Location, Media, MessageRecord,
    Order, Reaction, Referral, ReferredProduct, ReplyContext, SystemEvent, Text,
};
use crate::notification::{ButtonReply, FlowReply, ListReply};
use crate::{PlatformError, Timestamp};

/// The semantic category of a wire-level message type tag.
///
/// This is a pure lookup: tags are trimmed and matched case-insensitively,
/// and anything outside the fixed set maps to
/// [`MessageType::Unrecognized`] rather than an error — callers decide
/// whether that matters. Note that `unknown` is itself a *valid* tag: the
/// platform uses it for messages it could not process, which arrive with an
/// attached error list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MessageType {
    Text,
    Button,
    Document,
    Audio,
    Video,
    Image,
    Sticker,
    Interactive,
    Order,
    System,
    Unknown,
    Location,
    Reaction,
    Contacts,
    /// A tag outside the known set, or no tag at all.
    Unrecognized,
}

impl MessageType {
    /// Classifies a wire type tag.
    ///
    /// # Example
    /// ```rust
    /// use whatsapp_webhooks_rs::message::MessageType;
    ///
    /// assert_eq!(MessageType::parse("text"), MessageType::Text);
    /// assert_eq!(MessageType::parse(" Image "), MessageType::Image);
    /// assert_eq!(MessageType::parse("carousel"), MessageType::Unrecognized);
    /// ```
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        // Tags are documented lowercase; tolerate casing drift anyway.
        let matches = |known: &str| tag.eq_ignore_ascii_case(known);

        if matches("text") {
            Self::Text
        } else if matches("button") {
            Self::Button
        } else if matches("document") {
            Self::Document
        } else if matches("audio") {
            Self::Audio
        } else if matches("video") {
            Self::Video
        } else if matches("image") {
            Self::Image
        } else if matches("sticker") {
            Self::Sticker
        } else if matches("interactive") {
            Self::Interactive
        } else if matches("order") {
            Self::Order
        } else if matches("system") {
            Self::System
        } else if matches("unknown") {
            Self::Unknown
        } else if matches("location") {
            Self::Location
        } else if matches("reaction") {
            Self::Reaction
        } else if matches("contacts") {
            Self::Contacts
        } else {
            Self::Unrecognized
        }
    }
}

/// The five media kinds the platform delivers.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
    Image,
    Document,
    Sticker,
}

/// A classified media message: the kind (from the type tag) plus the media
/// reference itself.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct MediaMessage {
    pub kind: MediaKind,
    pub media: Media,
}

/// A text message that arrived through a click-to-WhatsApp ad, bundling the
/// text with its referral metadata.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct ReferralMessage {
    pub text: Text,
    pub referral: Referral,
}

/// A text message enquiring about a specific catalog product.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct ProductEnquiry {
    pub text: Text,
    pub product: ReferredProduct,
}

/// The classified payload of one inbound message.
///
/// Exactly one variant per message; each variant is what the matching
/// registered handler receives as its typed payload.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Content {
    /// A plain text message (no referral, no product enquiry).
    Text(Text),

    /// An image, audio, video, document or sticker message.
    Media(MediaMessage),

    /// A shared location.
    Location(Location),

    /// One or more shared contact cards.
    Contacts(Vec<ContactCard>),

    /// An emoji reaction to an earlier message.
    Reaction(Reaction),

    /// A catalog order.
    Order(Order),

    /// A quick-reply button press on a template message.
    Button(Button),

    /// A system event (number change etc.).
    System(SystemEvent),

    /// A customer identity change.
    IdentityChange(CustomerIdentity),

    /// A selection from an interactive list message.
    ListReply(ListReply),

    /// A press of an interactive reply button.
    ButtonReply(ButtonReply),

    /// A completed WhatsApp Flow submission.
    FlowReply(FlowReply),

    /// An interactive payload whose discriminator matched none of the
    /// reply kinds above.
    Interactive(InteractiveRecord),

    /// Text plus ad-referral metadata.
    Referral(ReferralMessage),

    /// Text enquiring about a catalog product.
    ProductEnquiry(ProductEnquiry),

    /// A message the platform itself could not process, with its attached
    /// error list.
    Unknown(Vec<PlatformError>),
}

/// Read-only per-message context handed to the matched handler.
///
/// Built once per message before classification, so it is available even
/// when classification fails.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct MessageInfo {
    pub(crate) sender: String,
    pub(crate) id: String,
    pub(crate) timestamp: Option<Timestamp>,
    pub(crate) kind: String,
    pub(crate) reply_to: Option<ReplyContext>,
}

impl MessageInfo {
    pub(crate) fn from_record(record: &MessageRecord) -> Self {
        Self {
            sender: record.from.clone(),
            id: record.id.clone(),
            timestamp: record.timestamp,
            kind: record.kind.clone(),
            reply_to: record.context.clone(),
        }
    }

    /// The sender's WhatsApp id.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// The message id assigned by WhatsApp.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the message was sent (unix seconds), if reported.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// The raw wire type tag (possibly empty).
    pub fn type_tag(&self) -> &str {
        &self.kind
    }

    /// Reply/forward context, when the message relates to another message.
    pub fn reply_to(&self) -> Option<&ReplyContext> {
        self.reply_to.as_ref()
    }
}

/// Determines the concrete [`Content`] variant of one decoded message.
///
/// The rules are priority-ordered and the first match wins. Most tags map
/// directly; the interesting cases are:
///
/// - `interactive` sub-dispatches on the interactive payload's own
///   discriminator (`list_reply` / `button_reply` / `nfm_reply`, anything
///   else staying generic);
/// - `text` is re-examined for a `referral` object (ad click-through) and
///   then for a context naming a `referred_product` (product enquiry)
///   before settling on plain text — in that order, so a message carrying
///   both classifies as [`Content::Referral`];
/// - a missing or unrecognized tag falls back to whichever of the
///   contacts / location / identity payload fields is populated.
///
/// Only when every rule is exhausted does classification fail, and the
/// dispatch engine records that failure as recoverable.
///
/// Classification is a pure function of the record: classifying a clone of
/// the same record always yields the same variant.
pub fn classify(record: MessageRecord) -> Result<Content, UnsupportedMessageType> {
    let content = match MessageType::parse(&record.kind) {
        MessageType::Order => Content::Order(record.order.unwrap_or_default()),
        MessageType::Button => Content::Button(record.button.unwrap_or_default()),
        MessageType::Audio => media(MediaKind::Audio, record.audio),
        MessageType::Video => media(MediaKind::Video, record.video),
        MessageType::Image => media(MediaKind::Image, record.image),
        MessageType::Document => media(MediaKind::Document, record.document),
        MessageType::Sticker => media(MediaKind::Sticker, record.sticker),
        MessageType::Interactive => {
            let interactive = record.interactive.unwrap_or_default();
            match interactive.kind.as_str() {
                "list_reply" => Content::ListReply(interactive.list_reply.unwrap_or_default()),
                "button_reply" => {
                    Content::ButtonReply(interactive.button_reply.unwrap_or_default())
                }
                "nfm_reply" => Content::FlowReply(interactive.nfm_reply.unwrap_or_default()),
                _ => Content::Interactive(interactive),
            }
        }
        MessageType::System => Content::System(record.system.unwrap_or_default()),
        MessageType::Unknown => Content::Unknown(record.errors),
        MessageType::Text => {
            let text = record.text.unwrap_or_default();
            if let Some(referral) = record.referral {
                Content::Referral(ReferralMessage { text, referral })
            } else if let Some(product) = record.context.and_then(|ctx| ctx.referred_product) {
                Content::ProductEnquiry(ProductEnquiry { text, product })
            } else {
                Content::Text(text)
            }
        }
        MessageType::Reaction => Content::Reaction(record.reaction.unwrap_or_default()),
        MessageType::Location => Content::Location(record.location.unwrap_or_default()),
        MessageType::Contacts => Content::Contacts(record.contacts),
        MessageType::Unrecognized => {
            // No usable tag: identify by whichever payload field is populated.
            if !record.contacts.is_empty() {
                Content::Contacts(record.contacts)
            } else if let Some(location) = record.location {
                Content::Location(location)
            } else if let Some(identity) = record.identity {
                Content::IdentityChange(identity)
            } else {
                return Err(UnsupportedMessageType {
                    tag: record.kind,
                    message_id: record.id,
                });
            }
        }
    };

    Ok(content)
}

fn media(kind: MediaKind, media: Option<Media>) -> Content {
    Content::Media(MediaMessage {
        kind,
        media: media.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TAGS: &[&str] = &[
        "text",
        "button",
        "document",
        "audio",
        "video",
        "image",
        "sticker",
        "interactive",
        "order",
        "system",
        "unknown",
        "location",
        "reaction",
        "contacts",
    ];

    fn record(kind: &str) -> MessageRecord {
        MessageRecord {
            from: "16315551234".into(),
            id: "wamid.TEST".into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    #[test]
    fn registry_covers_every_known_tag() {
        for tag in ALL_TAGS {
            assert_ne!(
                MessageType::parse(tag),
                MessageType::Unrecognized,
                "tag {tag:?} should be recognized"
            );
        }
        assert_eq!(MessageType::parse(""), MessageType::Unrecognized);
        assert_eq!(MessageType::parse("carousel"), MessageType::Unrecognized);
    }

    #[test]
    fn registry_trims_and_ignores_case() {
        assert_eq!(MessageType::parse("  TEXT "), MessageType::Text);
        assert_eq!(MessageType::parse("Sticker"), MessageType::Sticker);
    }

    #[test]
    fn classification_is_total_over_all_tags() {
        // Every known tag plus the empty string yields exactly one variant
        // or an explicit unsupported error; nothing panics on a bare record.
        for tag in ALL_TAGS {
            classify(record(tag)).unwrap();
        }
        let err = classify(record("")).unwrap_err();
        assert_eq!(err.message_id, "wamid.TEST");
    }

    #[test]
    fn media_tags_carry_their_kind() {
        let mut rec = record("video");
        rec.video = Some(Media {
            id: "MEDIA".into(),
            ..Default::default()
        });
        match classify(rec).unwrap() {
            Content::Media(MediaMessage { kind, media }) => {
                assert_eq!(kind, MediaKind::Video);
                assert_eq!(media.id, "MEDIA");
            }
            other => panic!("expected media, got {other:?}"),
        }
    }

    #[test]
    fn referral_outranks_product_enquiry_on_text() {
        let mut rec = record("text");
        rec.text = Some(Text {
            body: "hi".into(),
            ..Default::default()
        });
        rec.referral = Some(Referral {
            source_url: "https://fb.me/ad".into(),
            ..Default::default()
        });
        // A reply-context naming a product as well: referral still wins.
        rec.context = Some(ReplyContext {
            referred_product: Some(ReferredProduct {
                catalog_id: "CAT".into(),
                product_retailer_id: "SKU".into(),
            }),
            ..Default::default()
        });

        match classify(rec).unwrap() {
            Content::Referral(bundle) => {
                assert_eq!(bundle.text.body, "hi");
                assert_eq!(bundle.referral.source_url, "https://fb.me/ad");
            }
            other => panic!("expected referral, got {other:?}"),
        }
    }

    #[test]
    fn product_enquiry_outranks_plain_text() {
        let mut rec = record("text");
        rec.text = Some(Text {
            body: "does it come in blue?".into(),
            ..Default::default()
        });
        rec.context = Some(ReplyContext {
            referred_product: Some(ReferredProduct {
                catalog_id: "CAT".into(),
                product_retailer_id: "SKU".into(),
            }),
            ..Default::default()
        });

        match classify(rec).unwrap() {
            Content::ProductEnquiry(enquiry) => {
                assert_eq!(enquiry.product.product_retailer_id, "SKU")
            }
            other => panic!("expected product enquiry, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_stays_text() {
        let mut rec = record("text");
        rec.text = Some(Text {
            body: "hello".into(),
            ..Default::default()
        });
        // An ordinary reply context (no referred product) changes nothing.
        rec.context = Some(ReplyContext {
            id: Some("wamid.EARLIER".into()),
            ..Default::default()
        });
        assert!(matches!(classify(rec).unwrap(), Content::Text(t) if t.body == "hello"));
    }

    #[test]
    fn interactive_sub_dispatches_on_inner_discriminator() {
        let mut rec = record("interactive");
        rec.interactive = Some(InteractiveRecord {
            kind: "list_reply".into(),
            list_reply: Some(ListReply {
                id: "row_1".into(),
                title: "First".into(),
                description: None,
            }),
            ..Default::default()
        });
        assert!(matches!(
            classify(rec).unwrap(),
            Content::ListReply(reply) if reply.id == "row_1"
        ));

        let mut rec = record("interactive");
        rec.interactive = Some(InteractiveRecord {
            kind: "nfm_reply".into(),
            nfm_reply: Some(FlowReply::default()),
            ..Default::default()
        });
        assert!(matches!(classify(rec).unwrap(), Content::FlowReply(_)));

        // An unrecognized inner discriminator stays generic.
        let mut rec = record("interactive");
        rec.interactive = Some(InteractiveRecord {
            kind: "cta_url".into(),
            ..Default::default()
        });
        assert!(matches!(classify(rec).unwrap(), Content::Interactive(_)));
    }

    #[test]
    fn unknown_tag_carries_platform_errors() {
        let mut rec = record("unknown");
        rec.errors = vec![PlatformError {
            code: 131051,
            title: Some("Unsupported message type".into()),
            ..Default::default()
        }];
        match classify(rec).unwrap() {
            Content::Unknown(errors) => assert_eq!(errors[0].code, 131051),
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn missing_tag_falls_back_to_populated_payload() {
        let mut rec = record("");
        rec.location = Some(Location {
            latitude: 6.5,
            longitude: 3.3,
            ..Default::default()
        });
        assert!(matches!(classify(rec).unwrap(), Content::Location(_)));

        let mut rec = record("definitely_new_tag");
        rec.contacts = vec![ContactCard::default()];
        assert!(matches!(classify(rec).unwrap(), Content::Contacts(_)));

        let mut rec = record("");
        rec.identity = Some(CustomerIdentity {
            hash: "h4sh".into(),
            ..Default::default()
        });
        assert!(matches!(classify(rec).unwrap(), Content::IdentityChange(_)));
    }

    #[test]
    fn classification_is_idempotent() {
        let mut rec = record("text");
        rec.text = Some(Text {
            body: "same".into(),
            ..Default::default()
        });
        let first = classify(rec.clone()).unwrap();
        let second = classify(rec).unwrap();
        assert_eq!(first, second);
    }
}
