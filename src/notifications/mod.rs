//! Transactional emails sent after specific writes commit.
//!
//! Delivery is best effort: failures are logged and never reach the caller,
//! and the triggering write is never rolled back.

pub mod mailer;

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::MailConfig;
use crate::entities::{order, product, review, shipping, to_cents, user};
use mailer::{Mailer, OutgoingEmail};

#[derive(Clone, Debug, Default)]
pub struct NotificationConfig {
    pub sender: Option<String>,
    pub manager_email: Option<String>,
}

impl From<&MailConfig> for NotificationConfig {
    fn from(config: &MailConfig) -> Self {
        NotificationConfig {
            sender: config.sender.clone(),
            manager_email: config.manager_email.clone(),
        }
    }
}

pub struct Notifier {
    config: NotificationConfig,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(config: NotificationConfig, mailer: Arc<dyn Mailer>) -> Self {
        Notifier { config, mailer }
    }

    pub async fn order_created(&self, order: &order::Model, customer: &user::Model) {
        if let Some(email) = self.order_email(order, customer) {
            self.deliver("order_created", email).await;
        }
    }

    pub async fn review_created(
        &self,
        review: &review::Model,
        product: &product::Model,
        reviewer: &user::Model,
    ) {
        if let Some(email) = self.review_email(review, product, reviewer) {
            self.deliver("review_created", email).await;
        }
    }

    /// Called after every save of a shipping record. Sends whenever
    /// `shipped_date` is set, including repeated saves of a shipped record.
    pub async fn shipping_saved(&self, shipping: &shipping::Model, customer: &user::Model) {
        if let Some(email) = self.shipping_email(shipping, customer) {
            self.deliver("shipping_saved", email).await;
        }
    }

    fn order_email(&self, order: &order::Model, customer: &user::Model) -> Option<OutgoingEmail> {
        let from = non_empty(self.config.sender.as_deref())?;
        let to = non_empty(Some(customer.email.as_str()))?;

        Some(OutgoingEmail {
            from: from.to_owned(),
            to: to.to_owned(),
            subject: "Thank you for your order!".to_string(),
            body: format!(
                "Dear {},\n\nYour order #{} has been created.\nOrder total: {}.\n\nThank you for shopping with us!",
                customer.username,
                order.id,
                format_amount(order.total_amount),
            ),
        })
    }

    fn review_email(
        &self,
        review: &review::Model,
        product: &product::Model,
        reviewer: &user::Model,
    ) -> Option<OutgoingEmail> {
        let from = non_empty(self.config.sender.as_deref())?;
        let to = non_empty(self.config.manager_email.as_deref())?;

        Some(OutgoingEmail {
            from: from.to_owned(),
            to: to.to_owned(),
            subject: format!("New review for {}", product.name),
            body: format!(
                "Dear manager,\n\nProduct '{}' received a new review from {}.\n\nRating: {}/5\nComment: {}\n\nSee the dashboard for details.",
                product.name, reviewer.username, review.rating, review.comment,
            ),
        })
    }

    fn shipping_email(
        &self,
        shipping: &shipping::Model,
        customer: &user::Model,
    ) -> Option<OutgoingEmail> {
        shipping.shipped_date?;
        let from = non_empty(self.config.sender.as_deref())?;
        let to = non_empty(Some(customer.email.as_str()))?;

        Some(OutgoingEmail {
            from: from.to_owned(),
            to: to.to_owned(),
            subject: format!("Your order #{} has been delivered", shipping.order_id),
            body: format!(
                "Dear {},\n\nYour order #{} has been delivered.\n\nThank you for choosing our store!",
                customer.username, shipping.order_id,
            ),
        })
    }

    async fn deliver(&self, kind: &'static str, email: OutgoingEmail) {
        match self.mailer.send(&email).await {
            Ok(()) => info!(kind, to = %email.to, "Notification sent"),
            Err(err) => error!(kind, to = %email.to, error = %err, "Failed to send notification"),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn format_amount(amount: Decimal) -> String {
    to_cents(amount).to_string()
}
