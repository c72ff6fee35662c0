//! Dice-duel stage.
//!
//! Rolls two dice two seconds apart, delivering them as one message
//! that gets edited for the second roll. While the rolls play out, a
//! detached task asks the text-understanding collaborator to negate the
//! user's sentence; the response-construction stage consumes the result
//! for the no-doubles case.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::oneshot;

use crate::error::PipelineError;
use crate::nlu::TextUnderstanding;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;

/// Pause between the two rolls.
const ROLL_PAUSE: Duration = Duration::from_secs(2);

/// Fallback when negation is unavailable.
const NEGATION_FALLBACK: &str = "nice prompt...";

pub struct DiceStage {
    nlu: Option<Arc<dyn TextUnderstanding>>,
}

impl DiceStage {
    pub fn new(nlu: Option<Arc<dyn TextUnderstanding>>) -> Self {
        Self { nlu }
    }

    fn roll() -> u8 {
        rand::thread_rng().gen_range(1..=6)
    }
}

#[async_trait]
impl Stage for DiceStage {
    fn name(&self) -> &'static str {
        "dice"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if cx.action != Action::DiceDuel {
            return Ok(());
        }

        let die1 = Self::roll();
        let first_text = format!("Die 1: {die1}");
        let message_id = match cx
            .platform
            .send_text(&cx.chat_id, &first_text, Some(&cx.id))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to send first roll");
                None
            }
        };

        // Sending a message clears the typing indicator on some platforms.
        if let Err(e) = cx.platform.send_typing(&cx.chat_id).await {
            tracing::debug!(error = %e, "typing refresh failed");
        }

        // Kick off negation while the second roll is pending.
        let (tx, rx) = oneshot::channel();
        cx.negation = Some(rx);
        let parsed_text = cx.parsed_text.clone();
        match &self.nlu {
            Some(nlu) => {
                let nlu = Arc::clone(nlu);
                tokio::spawn(async move {
                    let negated = match nlu.negate(&parsed_text).await {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "negation failed, using fallback");
                            NEGATION_FALLBACK.to_string()
                        }
                    };
                    let _ = tx.send(negated);
                });
            }
            None => {
                let _ = tx.send(NEGATION_FALLBACK.to_string());
            }
        }

        tokio::time::sleep(ROLL_PAUSE).await;

        let die2 = Self::roll();
        if let Some(id) = &message_id {
            let both = format!("{first_text}\nDie 2: {die2}");
            if let Err(e) = cx.platform.edit_text(&cx.chat_id, id, &both).await {
                tracing::warn!(error = %e, "failed to edit in second roll");
            }
        }

        cx.got_doubles = die1 == die2;
        cx.last_roll_at = Some(Instant::now());
        Ok(())
    }
}
