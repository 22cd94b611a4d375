use std::sync::Arc;
use std::time::Duration;

use hypr_script_align::{
    AlignmentEngine, BridgeGenerator, EngineConfig, EngineSnapshot, GenerationError,
    GenerationReply, MergeReport, ReconstructionRequest, Schedule, SuggestionOutcome,
    TranscriptEvent, TriggerAction,
};
use ractor::{Actor, ActorProcessingErr, ActorRef, MessagingErr, RpcReplyPort};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::actors::session_span;
use crate::{AlignmentEvent, DiscardReason, Error, PrompterRuntime, ReconstructionEvent};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(10);

pub enum SessionMsg {
    Transcript(TranscriptEvent),
    LoadScript(String),
    Accept(RpcReplyPort<Option<MergeReport>>),
    Dismiss(RpcReplyPort<bool>),
    GetSnapshot(RpcReplyPort<EngineSnapshot>),
    DebounceElapsed {
        gap_version: u64,
    },
    GenerationFinished {
        request_id: u64,
        result: Result<GenerationReply, GenerationError>,
    },
}

pub struct SessionArgs {
    pub session_id: String,
    pub script: String,
    pub config: EngineConfig,
    pub generator: Arc<dyn BridgeGenerator>,
    pub runtime: Arc<dyn PrompterRuntime>,
    pub generation_timeout: Duration,
}

impl SessionArgs {
    pub fn new(
        script: impl Into<String>,
        generator: Arc<dyn BridgeGenerator>,
        runtime: Arc<dyn PrompterRuntime>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            script: script.into(),
            config: EngineConfig::default(),
            generator,
            runtime,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

type Timer = JoinHandle<Result<(), MessagingErr<SessionMsg>>>;

pub struct SessionState {
    session_id: String,
    span: tracing::Span,
    engine: AlignmentEngine,
    generator: Arc<dyn BridgeGenerator>,
    runtime: Arc<dyn PrompterRuntime>,
    generation_timeout: Duration,
    /// Gap version the timer was armed for, and the timer.
    debounce: Option<(u64, Timer)>,
    in_flight: Option<JoinHandle<()>>,
}

impl SessionState {
    fn cancel_debounce(&mut self) {
        if let Some((_, timer)) = self.debounce.take() {
            timer.abort();
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    fn arm(&mut self, myself: &ActorRef<SessionMsg>, schedule: Option<Schedule>) {
        let Some(Schedule { gap_version, delay }) = schedule else {
            return;
        };
        self.cancel_debounce();
        tracing::debug!(gap_version, delay_ms = delay.as_millis() as u64, "debounce_armed");
        let timer = myself.send_after(delay, move || SessionMsg::DebounceElapsed { gap_version });
        self.debounce = Some((gap_version, timer));
    }

    fn emit_loaded(&self) {
        let script = self.engine.script();
        self.runtime.emit_alignment(AlignmentEvent::ScriptLoaded {
            session_id: self.session_id.clone(),
            script_version: script.version(),
            word_count: script.words().len(),
        });
    }
}

pub struct SessionActor;

impl SessionActor {
    pub fn name(session_id: &str) -> ractor::ActorName {
        format!("prompter_session_{session_id}").into()
    }
}

pub async fn spawn_session(args: SessionArgs) -> crate::Result<ActorRef<SessionMsg>> {
    let name = SessionActor::name(&args.session_id);
    let (actor, _) = Actor::spawn(Some(name), SessionActor, args).await?;
    Ok(actor)
}

#[ractor::async_trait]
impl Actor for SessionActor {
    type Msg = SessionMsg;
    type State = SessionState;
    type Arguments = SessionArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let span = session_span(&args.session_id);
        let state = SessionState {
            engine: AlignmentEngine::with_config(args.script, args.config),
            session_id: args.session_id,
            span,
            generator: args.generator,
            runtime: args.runtime,
            generation_timeout: args.generation_timeout,
            debounce: None,
            in_flight: None,
        };

        {
            let _guard = state.span.enter();
            tracing::info!(
                words = state.engine.script().words().len(),
                "session_started"
            );
        }
        state.emit_loaded();

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let span = state.span.clone();
        let _guard = span.enter();

        match message {
            SessionMsg::Transcript(event) => {
                let outcome = state.engine.process(&event);
                state.arm(&myself, outcome.schedule);

                state.runtime.emit_alignment(AlignmentEvent::Progress {
                    session_id: state.session_id.clone(),
                    kind: outcome.kind,
                    is_fully_matched: outcome.batch.is_fully_matched,
                    snapshot: state.engine.snapshot(),
                });
            }
            SessionMsg::LoadScript(text) => {
                // a generation still in flight stays pending and lands as superseded
                state.cancel_debounce();
                state.engine.load_script(text);
                state.emit_loaded();
            }
            SessionMsg::DebounceElapsed { gap_version } => {
                if matches!(state.debounce, Some((armed, _)) if armed == gap_version) {
                    state.debounce = None;
                }
                let now = tokio::time::Instant::now().into_std();
                match state.engine.on_debounce_elapsed(gap_version, now) {
                    TriggerAction::Idle => {}
                    TriggerAction::Defer(delay) => {
                        state.arm(&myself, Some(Schedule { gap_version, delay }));
                    }
                    TriggerAction::Issue(request) => {
                        state
                            .runtime
                            .emit_reconstruction(ReconstructionEvent::Requested {
                                session_id: state.session_id.clone(),
                                request_id: request.id,
                                skipped_text: request.skipped_text.clone(),
                            });
                        start_generation(&myself, state, request);
                    }
                }
            }
            SessionMsg::GenerationFinished { request_id, result } => {
                let resolution = state.engine.on_generation_result(request_id, result);
                if resolution.outcome != SuggestionOutcome::Unknown {
                    state.in_flight = None;
                }

                let reason = match resolution.outcome {
                    SuggestionOutcome::Shown(suggestion) => {
                        state
                            .runtime
                            .emit_reconstruction(ReconstructionEvent::Suggested {
                                session_id: state.session_id.clone(),
                                suggestion,
                            });
                        None
                    }
                    SuggestionOutcome::Skipped => Some(DiscardReason::Skipped),
                    SuggestionOutcome::Failed => Some(DiscardReason::Failed),
                    SuggestionOutcome::Stale => Some(DiscardReason::Stale),
                    SuggestionOutcome::Superseded => Some(DiscardReason::Superseded),
                    SuggestionOutcome::Unknown => None,
                };

                if let Some(reason) = reason {
                    state
                        .runtime
                        .emit_reconstruction(ReconstructionEvent::Discarded {
                            session_id: state.session_id.clone(),
                            request_id,
                            reason,
                        });
                }
                state.arm(&myself, resolution.schedule);
            }
            SessionMsg::Accept(reply) => {
                let report = state.engine.accept_suggestion();
                if let Some(report) = &report {
                    state.cancel_debounce();
                    state
                        .runtime
                        .emit_reconstruction(ReconstructionEvent::Merged {
                            session_id: state.session_id.clone(),
                            report: report.clone(),
                            script: state.engine.script().text().to_string(),
                        });
                }
                let _ = reply.send(report);
            }
            SessionMsg::Dismiss(reply) => {
                let dismissed = state.engine.dismiss_suggestion();
                if dismissed {
                    state.cancel_debounce();
                    state
                        .runtime
                        .emit_reconstruction(ReconstructionEvent::Dismissed {
                            session_id: state.session_id.clone(),
                        });
                }
                let _ = reply.send(dismissed);
            }
            SessionMsg::GetSnapshot(reply) => {
                let _ = reply.send(state.engine.snapshot());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.cancel_debounce();
        state.cancel_in_flight();

        let _guard = state.span.enter();
        tracing::info!("session_stopped");
        Ok(())
    }
}

fn start_generation(
    myself: &ActorRef<SessionMsg>,
    state: &mut SessionState,
    request: ReconstructionRequest,
) {
    let generator = state.generator.clone();
    let timeout = state.generation_timeout;
    let actor = myself.clone();

    let task = async move {
        let request_id = request.id;
        let result = match tokio::time::timeout(timeout, generator.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::GenerationTimeout(timeout).into()),
        };

        if let Err(error) = actor.cast(SessionMsg::GenerationFinished { request_id, result }) {
            tracing::warn!(request_id, %error, "generation_result_undeliverable");
        }
    };

    state.in_flight = Some(tokio::spawn(task.instrument(state.span.clone())));
}

pub async fn snapshot(actor: &ActorRef<SessionMsg>) -> crate::Result<EngineSnapshot> {
    ractor::call!(actor, SessionMsg::GetSnapshot).map_err(|e| Error::Unreachable(e.to_string()))
}

pub async fn accept(actor: &ActorRef<SessionMsg>) -> crate::Result<Option<MergeReport>> {
    ractor::call!(actor, SessionMsg::Accept).map_err(|e| Error::Unreachable(e.to_string()))
}

pub async fn dismiss(actor: &ActorRef<SessionMsg>) -> crate::Result<bool> {
    ractor::call!(actor, SessionMsg::Dismiss).map_err(|e| Error::Unreachable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use hypr_script_align::{BoxFuture, TriggerConfig};

    use super::*;

    const LECTURE: &str = "Intro line. Alpha beta gamma delta. Closing words here.";

    #[derive(Default)]
    struct Recorder {
        alignment: Mutex<Vec<AlignmentEvent>>,
        reconstruction: Mutex<Vec<ReconstructionEvent>>,
    }

    impl Recorder {
        fn reconstruction(&self) -> Vec<ReconstructionEvent> {
            self.reconstruction.lock().unwrap().clone()
        }

        fn requested(&self) -> usize {
            self.reconstruction()
                .iter()
                .filter(|e| matches!(e, ReconstructionEvent::Requested { .. }))
                .count()
        }
    }

    impl PrompterRuntime for Recorder {
        fn emit_alignment(&self, event: AlignmentEvent) {
            self.alignment.lock().unwrap().push(event);
        }

        fn emit_reconstruction(&self, event: ReconstructionEvent) {
            self.reconstruction.lock().unwrap().push(event);
        }
    }

    enum Behaviour {
        Reply(&'static str),
        Hang,
    }

    struct FakeGenerator {
        behaviour: Behaviour,
        calls: Mutex<Vec<ReconstructionRequest>>,
    }

    impl FakeGenerator {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: Mutex::new(vec![]),
            })
        }
    }

    impl BridgeGenerator for FakeGenerator {
        fn generate<'a>(
            &'a self,
            request: &'a ReconstructionRequest,
        ) -> BoxFuture<'a, Result<GenerationReply, GenerationError>> {
            self.calls.lock().unwrap().push(request.clone());
            Box::pin(async move {
                match self.behaviour {
                    Behaviour::Reply(text) => Ok(GenerationReply::from_raw(text)),
                    Behaviour::Hang => std::future::pending().await,
                }
            })
        }
    }

    async fn start(
        generator: Arc<FakeGenerator>,
    ) -> (ActorRef<SessionMsg>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut args = SessionArgs::new(LECTURE, generator, recorder.clone());
        // paused clock: keep request spacing out of the picture
        args.config.trigger = TriggerConfig {
            min_spacing: Duration::ZERO,
            ..TriggerConfig::default()
        };
        let actor = spawn_session(args).await.unwrap();
        (actor, recorder)
    }

    fn say(actor: &ActorRef<SessionMsg>, text: &str) {
        actor
            .cast(SessionMsg::Transcript(TranscriptEvent::final_text(text)))
            .unwrap();
    }

    async fn settle(actor: &ActorRef<SessionMsg>, wait: Duration) -> EngineSnapshot {
        tokio::time::sleep(wait).await;
        snapshot(actor).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_then_suggestion_then_accept() {
        let generator = FakeGenerator::new(Behaviour::Reply("Let me recap."));
        let (actor, recorder) = start(generator.clone()).await;

        say(&actor, "Intro line.");
        say(&actor, "delta.");
        let snap = settle(&actor, Duration::from_millis(1000)).await;
        assert_eq!(snap.skipped.len(), 1);
        assert_eq!(recorder.requested(), 0);

        let snap = settle(&actor, Duration::from_millis(300)).await;
        assert_eq!(recorder.requested(), 1);
        let suggestion = snap.suggestion.expect("suggestion shown");
        assert_eq!(suggestion.text, "Let me recap.");
        assert_eq!(generator.calls.lock().unwrap()[0].skipped_text, "Alpha beta gamma");

        let report = accept(&actor).await.unwrap().expect("merged");
        assert_eq!(report.script_version, 1);

        let events = recorder.reconstruction();
        let Some(ReconstructionEvent::Merged { script, .. }) = events.last() else {
            panic!("expected merge event, got {events:?}");
        };
        assert!(script.ends_with("Closing words here. Let me recap."));
        assert!(snapshot(&actor).await.unwrap().skipped.is_empty());

        actor.stop(None);
    }

    #[tokio::test(start_paused = true)]
    async fn gap_changes_restart_the_debounce() {
        let generator = FakeGenerator::new(Behaviour::Reply("[SKIP]"));
        let (actor, recorder) = start(generator.clone()).await;

        say(&actor, "beta");
        settle(&actor, Duration::from_millis(800)).await;
        say(&actor, "delta.");
        settle(&actor, Duration::from_millis(800)).await;
        assert_eq!(recorder.requested(), 0);

        settle(&actor, Duration::from_millis(500)).await;
        assert_eq!(recorder.requested(), 1);
        assert_eq!(generator.calls.lock().unwrap().len(), 1);

        let events = recorder.reconstruction();
        assert!(matches!(
            events.last(),
            Some(ReconstructionEvent::Discarded {
                reason: DiscardReason::Skipped,
                ..
            })
        ));

        actor.stop(None);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_generator_times_out_as_failure() {
        let generator = FakeGenerator::new(Behaviour::Hang);
        let (actor, recorder) = start(generator).await;

        say(&actor, "delta.");
        let snap = settle(&actor, Duration::from_millis(1300)).await;
        assert_eq!(snap.pending_request, Some(1));

        let snap = settle(&actor, DEFAULT_GENERATION_TIMEOUT).await;
        assert_eq!(snap.pending_request, None);
        assert!(snap.suggestion.is_none());
        assert!(matches!(
            recorder.reconstruction().last(),
            Some(ReconstructionEvent::Discarded {
                reason: DiscardReason::Failed,
                ..
            })
        ));

        actor.stop(None);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_does_not_issue_a_second_request_while_one_runs() {
        let generator = FakeGenerator::new(Behaviour::Hang);
        let (actor, recorder) = start(generator.clone()).await;

        say(&actor, "delta.");
        let snap = settle(&actor, Duration::from_millis(1300)).await;
        assert_eq!(snap.pending_request, Some(1));

        actor
            .cast(SessionMsg::LoadScript(LECTURE.into()))
            .unwrap();
        say(&actor, "delta.");
        let snap = settle(&actor, Duration::from_millis(1300)).await;
        assert_eq!(snap.script_version, 1);
        assert_eq!(snap.pending_request, Some(1));
        assert_eq!(generator.calls.lock().unwrap().len(), 1);

        // request 1 times out, then the new script's gap gets its own request
        let snap = settle(&actor, DEFAULT_GENERATION_TIMEOUT).await;
        assert_eq!(snap.pending_request, Some(2));
        assert_eq!(recorder.requested(), 2);
        assert!(recorder.reconstruction().iter().any(|e| matches!(
            e,
            ReconstructionEvent::Discarded {
                request_id: 1,
                reason: DiscardReason::Superseded,
                ..
            }
        )));

        actor.stop(None);
    }

    #[tokio::test(start_paused = true)]
    async fn outdated_timer_message_leaves_armed_timer_alone() {
        let generator = FakeGenerator::new(Behaviour::Reply("Bridge."));
        let (actor, recorder) = start(generator).await;

        say(&actor, "delta.");
        actor
            .cast(SessionMsg::DebounceElapsed { gap_version: 0 })
            .unwrap();
        let snap = settle(&actor, Duration::from_millis(600)).await;
        assert!(snap.suggestion.is_none());
        assert_eq!(recorder.requested(), 0);

        let snap = settle(&actor, Duration::from_millis(700)).await;
        assert_eq!(recorder.requested(), 1);
        assert!(snap.suggestion.is_some());

        actor.stop(None);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_and_reload() {
        let generator = FakeGenerator::new(Behaviour::Reply("Bridge."));
        let (actor, recorder) = start(generator).await;

        assert!(!dismiss(&actor).await.unwrap());

        say(&actor, "delta.");
        let snap = settle(&actor, Duration::from_millis(1300)).await;
        assert!(snap.suggestion.is_some());
        assert!(dismiss(&actor).await.unwrap());

        actor
            .cast(SessionMsg::LoadScript("A new talk.".into()))
            .unwrap();
        let snap = snapshot(&actor).await.unwrap();
        assert_eq!(snap.script_version, 1);
        assert_eq!(snap.cursor, 0);
        assert!(snap.suggestion.is_none());

        let loaded = recorder
            .alignment
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, AlignmentEvent::ScriptLoaded { .. }))
            .count();
        assert_eq!(loaded, 2);

        actor.stop(None);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ReconstructionEvent::Discarded {
            session_id: "s".into(),
            request_id: 3,
            reason: DiscardReason::Stale,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "type": "reconstructionDiscarded",
                "session_id": "s",
                "request_id": 3,
                "reason": "stale",
            })
        );
    }
}
