//! The periodic tasks that run for the length of one session.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use steadyhand_config::{AppConfig, ConfigError};
use steadyhand_workflow::{Reschedule, ScheduledTask, TaskSet};

use crate::behavior::BehaviorLoop;
use crate::chat::{self, ChatScheduler};
use crate::context::SessionContext;
use crate::humanizer::HumanizerController;
use crate::hunger::HungerMaintainer;
use crate::rest::RestController;

/// Every controller, built once from config and shared by all sessions.
pub struct Controllers {
    pub behavior: BehaviorLoop,
    pub rest: RestController,
    pub humanizer: HumanizerController,
    pub chat: ChatScheduler,
    pub hunger: HungerMaintainer,
    login: Option<String>,
}

impl Controllers {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let invalid = |e: steadyhand_workflow::WeightError| ConfigError::ValidationError(e.to_string());
        Ok(Self {
            behavior: BehaviorLoop::new(config).map_err(invalid)?,
            rest: RestController::new(config.rest.clone()),
            humanizer: HumanizerController::new(&config.behavior.humanizer).map_err(invalid)?,
            chat: ChatScheduler::new(&config.chat),
            hunger: HungerMaintainer::new(config.hunger.clone()),
            login: chat::login_command(&config.auto_auth),
        })
    }
}

/// Start everything that runs while the agent is in the world.
pub fn spawn_session_tasks(ctx: &Arc<SessionContext>, controllers: &Arc<Controllers>) -> TaskSet {
    let config = ctx.config.clone();
    let mut tasks = TaskSet::new();

    tasks.push(ScheduledTask::repeating(
        "behavior",
        {
            let (ctx, controllers) = (ctx.clone(), controllers.clone());
            move || ctx.sample(controllers.behavior.reaction_delay())
        },
        {
            let (ctx, controllers) = (ctx.clone(), controllers.clone());
            move || {
                let (ctx, controllers) = (ctx.clone(), controllers.clone());
                async move {
                    let cycle = controllers.behavior.cycle(&ctx).await;
                    debug!(?cycle, "Decision cycle");
                    controllers.behavior.reschedule(&cycle)
                }
            }
        },
    ));

    if config.rest.enabled {
        let (ctx, controllers) = (ctx.clone(), controllers.clone());
        let period = controllers.rest.retry_interval();
        tasks.push(ScheduledTask::fixed_interval(
            "rest-enforcer",
            period,
            move || {
                let (ctx, controllers) = (ctx.clone(), controllers.clone());
                async move {
                    let outcome = controllers.rest.attempt(&ctx).await;
                    debug!(?outcome, "Rest enforcer tick");
                }
            },
        ));
    }

    if config.behavior.enabled && config.behavior.humanizer.enabled {
        tasks.push(ScheduledTask::repeating(
            "humanizer",
            {
                let (ctx, controllers) = (ctx.clone(), controllers.clone());
                move || ctx.sample(controllers.humanizer.interval())
            },
            {
                let (ctx, controllers) = (ctx.clone(), controllers.clone());
                move || {
                    let (ctx, controllers) = (ctx.clone(), controllers.clone());
                    async move {
                        controllers.humanizer.step(&ctx).await;
                        Reschedule::UsualDelay
                    }
                }
            },
        ));
    }

    if config.chat.enabled && controllers.chat.has_messages() {
        tasks.push(ScheduledTask::repeating(
            "chat",
            {
                let (ctx, controllers) = (ctx.clone(), controllers.clone());
                move || ctx.sample(controllers.chat.delay())
            },
            {
                let (ctx, controllers) = (ctx.clone(), controllers.clone());
                move || {
                    let (ctx, controllers) = (ctx.clone(), controllers.clone());
                    async move {
                        controllers.chat.tick(&ctx).await;
                        Reschedule::UsualDelay
                    }
                }
            },
        ));
    }

    if config.hunger.enabled {
        let (ctx, controllers) = (ctx.clone(), controllers.clone());
        let period = controllers.hunger.check_interval();
        tasks.push(ScheduledTask::fixed_interval("hunger", period, move || {
            let (ctx, controllers) = (ctx.clone(), controllers.clone());
            async move {
                controllers.hunger.check(&ctx).await;
            }
        }));
    }

    if let Some(command) = controllers.login.clone() {
        let ctx = ctx.clone();
        tasks.push(ScheduledTask::once("auto-auth", chat::LOGIN_DELAY, async move {
            chat::send_login(&ctx, &command).await;
        }));
    }

    info!(tasks = ?tasks.names(), "Session tasks started");
    tasks
}

/// A one-off rest attempt, used when night falls.
pub fn rest_now(ctx: &Arc<SessionContext>, controllers: &Arc<Controllers>) -> ScheduledTask {
    let (ctx, controllers) = (ctx.clone(), controllers.clone());
    ScheduledTask::once("rest-on-nightfall", Duration::ZERO, async move {
        let outcome = controllers.rest.attempt(&ctx).await;
        debug!(?outcome, "Nightfall rest attempt");
    })
}
