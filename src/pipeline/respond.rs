//! Text response construction stage.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;
use crate::platform::Service;
use crate::rates::RateSnapshot;

/// Minimum time between the last roll and the duel verdict, so the
/// edited second roll is visible before the punchline lands.
const ROLL_SETTLE: Duration = Duration::from_secs(5);

/// Nag sent when a requested download never made it.
const NAG_TEXT: &str = "Nice link...";

pub struct ConstructTextResponseStage;

#[async_trait]
impl Stage for ConstructTextResponseStage {
    fn name(&self) -> &'static str {
        "construct-text-response"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        match cx.action {
            Action::Ping => cx.text_response = "pong".to_string(),
            Action::DownloadVideo => {
                if cx.should_nag_about_original_message {
                    cx.text_response = NAG_TEXT.to_string();
                    cx.reply_to_id = cx.id.clone();
                    cx.should_reply_to_message = true;
                }
            }
            Action::DiceDuel => {
                let text = if cx.got_doubles {
                    format!("Doubles! 😎, {}", cx.parsed_text)
                } else {
                    let negated = match cx.negation.take() {
                        Some(rx) => rx.await.unwrap_or_else(|_| cx.parsed_text.clone()),
                        None => cx.parsed_text.clone(),
                    };
                    format!("No doubles 😿, {negated}")
                };
                if let Some(rolled_at) = cx.last_roll_at {
                    let elapsed = rolled_at.elapsed();
                    if elapsed < ROLL_SETTLE {
                        tokio::time::sleep(ROLL_SETTLE - elapsed).await;
                    }
                }
                cx.text_response = text;
            }
            Action::RateQuery => {
                if let Some(rates) = cx.rates {
                    cx.text_response = format_rates(&rates, cx.service);
                }
            }
            Action::SearchVideo | Action::None => {}
        }
        Ok(())
    }
}

/// Format a rate snapshot: HTML on Telegram, Markdown elsewhere.
fn format_rates(rates: &RateSnapshot, service: Service) -> String {
    let date = rates.date.format("%d.%m.");
    match service {
        Service::Telegram => format!(
            "<b>Reference rates</b> {date}\n\
             <b>12 mo</b>: {:.3} %\n\
             <b>6 mo</b>: {:.3} %\n\
             <b>3 mo</b>: {:.3} %",
            rates.twelve_months, rates.six_months, rates.three_months,
        ),
        Service::Discord => format!(
            "**Reference rates** {date}\n\
             **12 mo** {:.3} %\n\
             **6 mo** {:.3} %\n\
             **3 mo** {:.3} %",
            rates.twelve_months, rates.six_months, rates.three_months,
        ),
    }
}
