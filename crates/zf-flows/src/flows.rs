//! # Flows
//!
//! Typed wrappers around single model calls. Each flow validates its input,
//! builds a prompt, asks the model for JSON and validates what comes back.
//!
//! ```text
//! ┌──────────────┐   validate   ┌──────────┐  generate  ┌─────────────┐
//! │ FlowInput    │ ───────────► │  Prompt  │ ─────────► │ model text  │
//! └──────────────┘              └──────────┘            └──────┬──────┘
//!                                                              │ extract_json
//!                                              ┌───────────────▼──────────┐
//!                                              │ FlowOutput (validated)   │
//!                                              └──────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info};
use zf_core::{IconKey, Order, OrderStatus};

use crate::error::{FlowError, FlowResult};
use crate::genai::{extract_json, Prompt, TextModel};

const MAX_QUESTION_LEN: usize = 2000;
const MAX_HISTORY: usize = 20;
const MAX_CATEGORY_LEN: usize = 60;

fn parse_output<T: for<'de> Deserialize<'de>>(text: &str) -> FlowResult<T> {
    serde_json::from_str(extract_json(text))
        .map_err(|e| FlowError::InvalidOutput(format!("{}: {}", e, text.trim())))
}

// =============================================================================
// Order Status Prediction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictStatusInput {
    pub current_status: OrderStatus,
    pub days_since_created: i64,
    /// Negative once the deadline has passed.
    pub days_until_deadline: Option<i64>,
    /// One line per product, e.g. `2 x Corner sofa (Sofa)`.
    pub products: Vec<String>,
    pub notes: Option<String>,
    /// Latest chat messages, oldest first.
    pub recent_messages: Vec<String>,
}

impl PredictStatusInput {
    /// Summarizes an order as of `now`.
    pub fn from_order(order: &Order, now: DateTime<Utc>) -> Self {
        let skip = order.messages.len().saturating_sub(MAX_HISTORY);
        PredictStatusInput {
            current_status: order.status,
            days_since_created: order
                .created_at
                .map_or(0, |created| (now - created).num_days()),
            days_until_deadline: order.deadline.map(|deadline| (deadline - now).num_days()),
            products: order
                .products
                .iter()
                .map(|p| format!("{} x {} ({})", p.quantity, p.name, p.category))
                .collect(),
            notes: order.notes.clone(),
            recent_messages: order.messages[skip..]
                .iter()
                .map(|m| format!("{}: {}", m.author_name, m.text))
                .collect(),
        }
    }

    fn validate(&self) -> FlowResult<()> {
        if self.current_status.is_terminal() {
            return Err(FlowError::validation(
                "currentStatus",
                format!("order is already {}", self.current_status),
            ));
        }
        if self.recent_messages.len() > MAX_HISTORY {
            return Err(FlowError::validation(
                "recentMessages",
                format!("at most {} messages", MAX_HISTORY),
            ));
        }
        Ok(())
    }

    fn prompt(&self) -> Prompt {
        let mut user = String::new();
        let _ = writeln!(user, "Current status: {}", self.current_status);
        let _ = writeln!(user, "Days since the order was placed: {}", self.days_since_created);
        match self.days_until_deadline {
            Some(days) => {
                let _ = writeln!(user, "Days until the deadline: {}", days);
            }
            None => user.push_str("No deadline set.\n"),
        }
        if !self.products.is_empty() {
            let _ = writeln!(user, "Products:\n- {}", self.products.join("\n- "));
        }
        if let Some(notes) = &self.notes {
            let _ = writeln!(user, "Notes: {}", notes);
        }
        if !self.recent_messages.is_empty() {
            let _ = writeln!(user, "Recent messages:\n{}", self.recent_messages.join("\n"));
        }

        let statuses: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
        Prompt::new(user)
            .system(format!(
                "You track furniture orders through production. Predict the status the \
                 order should have next. Answer with JSON: \
                 {{\"predictedStatus\": one of [{}], \"confidence\": number between 0 and 1, \
                 \"reasoning\": short explanation}}.",
                statuses.join(", ")
            ))
            .json()
            .temperature(0.2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictStatusOutput {
    pub predicted_status: OrderStatus,
    pub confidence: f64,
    pub reasoning: String,
}

impl PredictStatusOutput {
    fn validate(self) -> FlowResult<Self> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(FlowError::InvalidOutput(format!(
                "confidence {} is outside 0..=1",
                self.confidence
            )));
        }
        if self.reasoning.trim().is_empty() {
            return Err(FlowError::InvalidOutput("empty reasoning".into()));
        }
        Ok(self)
    }
}

/// Suggests the next status for an order.
pub async fn predict_order_status(
    model: &dyn TextModel,
    input: &PredictStatusInput,
) -> FlowResult<PredictStatusOutput> {
    input.validate()?;
    let text = model.generate(&input.prompt()).await?;
    let output = parse_output::<PredictStatusOutput>(&text)?.validate()?;
    info!(
        predicted = %output.predicted_status,
        confidence = output.confidence,
        "Status predicted"
    );
    Ok(output)
}

// =============================================================================
// Chat Reply
// =============================================================================

/// One message of an order thread as the model sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub from_assistant: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReplyInput {
    pub customer_name: String,
    pub status: OrderStatus,
    pub history: Vec<ChatTurn>,
    pub question: String,
}

impl ChatReplyInput {
    pub fn from_order(order: &Order, question: impl Into<String>) -> Self {
        let skip = order.messages.len().saturating_sub(MAX_HISTORY);
        ChatReplyInput {
            customer_name: order.customer_name.clone(),
            status: order.status,
            history: order.messages[skip..]
                .iter()
                .map(|m| ChatTurn {
                    from_assistant: m.from_assistant,
                    text: m.text.clone(),
                })
                .collect(),
            question: question.into(),
        }
    }

    fn validate(&self) -> FlowResult<()> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(FlowError::validation("question", "is required"));
        }
        if question.chars().count() > MAX_QUESTION_LEN {
            return Err(FlowError::validation(
                "question",
                format!("at most {} characters", MAX_QUESTION_LEN),
            ));
        }
        Ok(())
    }

    fn prompt(&self) -> Prompt {
        let mut user = String::new();
        for turn in &self.history {
            let who = if turn.from_assistant { "Assistant" } else { "Staff" };
            let _ = writeln!(user, "{}: {}", who, turn.text);
        }
        let _ = writeln!(user, "Staff: {}", self.question.trim());

        Prompt::new(user)
            .system(format!(
                "You help the staff of a furniture workshop with the order of {}, \
                 currently {}. Reply briefly and politely. Answer with JSON: \
                 {{\"reply\": text}}.",
                self.customer_name, self.status
            ))
            .json()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReplyOutput {
    pub reply: String,
}

/// Drafts a reply in an order's chat thread.
pub async fn generate_chat_reply(
    model: &dyn TextModel,
    input: &ChatReplyInput,
) -> FlowResult<ChatReplyOutput> {
    input.validate()?;
    let text = model.generate(&input.prompt()).await?;
    let output: ChatReplyOutput = parse_output(&text)?;
    let reply = output.reply.trim();
    if reply.is_empty() {
        return Err(FlowError::InvalidOutput("empty reply".into()));
    }
    debug!(chars = reply.len(), "Chat reply generated");
    Ok(ChatReplyOutput {
        reply: reply.to_string(),
    })
}

// =============================================================================
// Category Icon
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconInput {
    pub category_name: String,
}

impl IconInput {
    pub fn new(category_name: impl Into<String>) -> Self {
        IconInput {
            category_name: category_name.into(),
        }
    }

    fn validate(&self) -> FlowResult<()> {
        let name = self.category_name.trim();
        if name.is_empty() {
            return Err(FlowError::validation("categoryName", "is required"));
        }
        if name.chars().count() > MAX_CATEGORY_LEN {
            return Err(FlowError::validation(
                "categoryName",
                format!("at most {} characters", MAX_CATEGORY_LEN),
            ));
        }
        Ok(())
    }

    fn prompt(&self) -> Prompt {
        Prompt::new(format!("Category: {}", self.category_name.trim()))
            .system(format!(
                "Pick the icon that best represents a furniture product category. \
                 Allowed icons: {}. Answer with JSON: {{\"icon\": one allowed icon}}.",
                IconKey::catalog()
            ))
            .json()
            .temperature(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconOutput {
    pub icon: IconKey,
}

#[derive(Deserialize)]
struct RawIcon {
    icon: String,
}

/// Picks an icon for a product category from the registry.
pub async fn suggest_category_icon(
    model: &dyn TextModel,
    input: &IconInput,
) -> FlowResult<IconOutput> {
    input.validate()?;
    let text = model.generate(&input.prompt()).await?;
    let raw: RawIcon = parse_output(&text)?;
    let icon = raw
        .icon
        .parse::<IconKey>()
        .map_err(|e| FlowError::InvalidOutput(e.to_string()))?;
    Ok(IconOutput { icon })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;
    use zf_core::{ChatMessage, Money, OrderProduct};

    /// Returns a fixed answer and records the prompts it saw.
    struct CannedModel {
        answer: String,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl CannedModel {
        fn new(answer: &str) -> Self {
            CannedModel {
                answer: answer.to_string(),
                prompts: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextModel for CannedModel {
        async fn generate(&self, prompt: &Prompt) -> FlowResult<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            Ok(self.answer.clone())
        }
    }

    fn order(now: DateTime<Utc>) -> Order {
        Order {
            id: "order-12345".to_string(),
            customer_id: "c1".to_string(),
            customer_name: "Dana".to_string(),
            status: OrderStatus::Designing,
            income_amount: Money::new(15_000),
            prepaid_amount: Money::new(7_500),
            expense_amount: None,
            deadline: Some(now + Duration::days(10)),
            created_at: Some(now - Duration::days(4)),
            owner_id: "u1".to_string(),
            products: vec![OrderProduct {
                name: "Corner sofa".to_string(),
                category: "Sofa".to_string(),
                quantity: 2,
                attachments: vec![],
            }],
            attachments: vec![],
            dimensions: None,
            colors: vec![],
            messages: vec![ChatMessage {
                author_id: "u1".to_string(),
                author_name: "Sam".to_string(),
                text: "Fabric approved".to_string(),
                from_assistant: false,
                sent_at: now,
            }],
            notes: None,
            predicted_status: None,
        }
    }

    #[test]
    fn test_predict_input_from_order() {
        let now = Utc::now();
        let input = PredictStatusInput::from_order(&order(now), now);

        assert_eq!(input.current_status, OrderStatus::Designing);
        assert_eq!(input.days_since_created, 4);
        assert_eq!(input.days_until_deadline, Some(10));
        assert_eq!(input.products, vec!["2 x Corner sofa (Sofa)".to_string()]);
        assert_eq!(input.recent_messages, vec!["Sam: Fabric approved".to_string()]);
    }

    #[tokio::test]
    async fn test_predict_order_status() {
        let model = CannedModel::new(
            "```json\n{\"predictedStatus\": \"Manufacturing\", \"confidence\": 0.8, \
             \"reasoning\": \"Design approved\"}\n```",
        );
        let now = Utc::now();
        let input = PredictStatusInput::from_order(&order(now), now);

        let output = predict_order_status(&model, &input).await.unwrap();
        assert_eq!(output.predicted_status, OrderStatus::Manufacturing);
        assert_eq!(output.confidence, 0.8);

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].json);
        assert!(prompts[0].user.contains("Corner sofa"));
    }

    #[tokio::test]
    async fn test_predict_rejects_out_of_range_confidence() {
        let model = CannedModel::new(
            r#"{"predictedStatus": "Completed", "confidence": 1.5, "reasoning": "x"}"#,
        );
        let now = Utc::now();
        let input = PredictStatusInput::from_order(&order(now), now);

        let err = predict_order_status(&model, &input).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_predict_skips_terminal_orders() {
        let model = CannedModel::new("{}");
        let now = Utc::now();
        let mut order = order(now);
        order.status = OrderStatus::Shipped;

        let input = PredictStatusInput::from_order(&order, now);
        let err = predict_order_status(&model, &input).await.unwrap_err();

        assert!(matches!(err, FlowError::Validation { field: "currentStatus", .. }));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_reply() {
        let model = CannedModel::new(r#"{"reply": "  Your sofa ships next week.  "}"#);
        let input = ChatReplyInput::from_order(&order(Utc::now()), "When will it ship?");

        let output = generate_chat_reply(&model, &input).await.unwrap();
        assert_eq!(output.reply, "Your sofa ships next week.");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].user.ends_with("Staff: When will it ship?\n"));
        assert!(prompts[0].system.as_deref().unwrap().contains("Dana"));
    }

    #[tokio::test]
    async fn test_chat_reply_validation() {
        let model = CannedModel::new(r#"{"reply": ""}"#);
        let order = order(Utc::now());

        let err = generate_chat_reply(&model, &ChatReplyInput::from_order(&order, "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation { field: "question", .. }));

        let err = generate_chat_reply(&model, &ChatReplyInput::from_order(&order, "Hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_suggest_category_icon() {
        let model = CannedModel::new(r#"{"icon": "lamp"}"#);
        let output = suggest_category_icon(&model, &IconInput::new("Lighting"))
            .await
            .unwrap();
        assert_eq!(output.icon, IconKey::Lamp);

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].system.as_deref().unwrap().contains("wardrobe"));
    }

    #[tokio::test]
    async fn test_unknown_icon_is_invalid_output() {
        let model = CannedModel::new(r#"{"icon": "spaceship"}"#);
        let err = suggest_category_icon(&model, &IconInput::new("Toys"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidOutput(_)));

        let err = suggest_category_icon(&model, &IconInput::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation { .. }));
    }
}
