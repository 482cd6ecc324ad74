//! NL toolkit service.
//!
//! One Python process hosts the NL utilities for the whole run. It is owned
//! by a single service thread; file workers talk to it through cloneable
//! [`NlpClient`]s that send a request plus a reply channel and block until
//! the service answers. Requests are therefore serialized to the process.
//!
//! The known-verb set is fetched once at start-up and shared read-only.

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use tugdoc_core::adapter::{NlToolkit, TaggedToken, ToolkitError, ToolkitResult};

use crate::worker::{spawn_worker, WorkerError, WorkerHandle, WorkerScript};

/// Embedded NL worker script.
const NLP_SCRIPT: WorkerScript = WorkerScript {
    file_name: "nlp_worker.py",
    source: include_str!("nlp_worker.py"),
};

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone)]
enum NlpCommand {
    Segment(String),
    SpellCorrect(Vec<String>),
    PosTag(String),
    Stem(Vec<String>),
}

impl NlpCommand {
    fn op(&self) -> &'static str {
        match self {
            NlpCommand::Segment(_) => "segment",
            NlpCommand::SpellCorrect(_) => "spell_correct",
            NlpCommand::PosTag(_) => "pos_tag",
            NlpCommand::Stem(_) => "stem",
        }
    }

    fn params(&self) -> serde_json::Value {
        match self {
            NlpCommand::Segment(identifier) => serde_json::json!({ "identifier": identifier }),
            NlpCommand::SpellCorrect(words) | NlpCommand::Stem(words) => {
                serde_json::json!({ "words": words })
            }
            NlpCommand::PosTag(phrase) => serde_json::json!({ "phrase": phrase }),
        }
    }

    /// Key of the reply payload.
    fn reply_key(&self) -> &'static str {
        match self {
            NlpCommand::Segment(_) | NlpCommand::SpellCorrect(_) => "words",
            NlpCommand::PosTag(_) => "tokens",
            NlpCommand::Stem(_) => "stems",
        }
    }
}

struct Envelope {
    command: NlpCommand,
    reply: mpsc::Sender<ToolkitResult<serde_json::Value>>,
}

enum Message {
    Request(Envelope),
    Shutdown,
}

// ============================================================================
// Service
// ============================================================================

/// Owner of the NL worker process and its service thread.
#[derive(Debug)]
pub struct NlpService {
    sender: mpsc::Sender<Message>,
    thread: Option<JoinHandle<()>>,
    verbs: Arc<HashSet<String>>,
}

impl NlpService {
    /// Start the NL worker with `python`, loading `module`.
    ///
    /// `module` is a dotted module name or a path to a `.py` file exposing
    /// an `NLPUtilities` class.
    pub fn start(python: &str, module: &str) -> ToolkitResult<Self> {
        info!(module, "loading NL toolkit");
        let mut handle = spawn_worker(python, NLP_SCRIPT, &[module.to_string()]).map_err(unavailable)?;

        let verbs_reply = handle
            .send_request("known_verbs", serde_json::json!({}))
            .map_err(|err| request_failed("known_verbs", err))?;
        let verbs: Vec<String> = decode("known_verbs", &verbs_reply.data, "verbs")?;
        let verbs = Arc::new(verbs.into_iter().collect::<HashSet<_>>());
        debug!(count = verbs.len(), "loaded known verbs");

        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("tugdoc-nlp".to_string())
            .spawn(move || serve(handle, receiver))
            .map_err(|e| ToolkitError::Unavailable {
                reason: format!("failed to start NL service thread: {}", e),
            })?;

        info!("NL toolkit loaded");
        Ok(NlpService {
            sender,
            thread: Some(thread),
            verbs,
        })
    }

    /// A handle for one file worker.
    pub fn client(&self) -> NlpClient {
        NlpClient {
            sender: self.sender.clone(),
            verbs: Arc::clone(&self.verbs),
        }
    }

    /// Stop the service thread and the worker process.
    ///
    /// Clients still alive afterwards get [`ToolkitError::Unavailable`].
    pub fn shutdown(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("NL service thread panicked");
            }
        }
    }
}

impl Drop for NlpService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(mut handle: WorkerHandle, receiver: mpsc::Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Shutdown => break,
            Message::Request(envelope) => {
                let op = envelope.command.op();
                let result = handle
                    .send_request(op, envelope.command.params())
                    .map_err(|err| request_failed(op, err))
                    .and_then(|response| {
                        response
                            .data
                            .get(envelope.command.reply_key())
                            .cloned()
                            .ok_or_else(|| ToolkitError::UnexpectedReply { op: op.to_string() })
                    });
                // The requester may have given up; nothing to do then.
                let _ = envelope.reply.send(result);
            }
        }
    }
    if let Err(err) = handle.shutdown() {
        debug!(error = %err, "NL worker shutdown");
    }
}

// ============================================================================
// Client
// ============================================================================

/// Cloneable [`NlToolkit`] that forwards to the [`NlpService`].
#[derive(Clone)]
pub struct NlpClient {
    sender: mpsc::Sender<Message>,
    verbs: Arc<HashSet<String>>,
}

impl std::fmt::Debug for NlpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NlpClient")
            .field("known_verbs", &self.verbs.len())
            .finish()
    }
}

impl NlpClient {
    fn call<T: DeserializeOwned>(&self, command: NlpCommand) -> ToolkitResult<T> {
        let op = command.op();
        let (reply, response) = mpsc::channel();
        self.sender
            .send(Message::Request(Envelope { command, reply }))
            .map_err(|_| ToolkitError::Unavailable {
                reason: "NL service has shut down".to_string(),
            })?;
        let value = response.recv().map_err(|_| ToolkitError::Unavailable {
            reason: "NL service dropped the request".to_string(),
        })??;
        serde_json::from_value(value).map_err(|_| ToolkitError::UnexpectedReply { op: op.to_string() })
    }
}

impl NlToolkit for NlpClient {
    fn segment(&self, identifier: &str) -> ToolkitResult<Vec<String>> {
        self.call(NlpCommand::Segment(identifier.to_string()))
    }

    fn spell_correct(&self, words: &[String]) -> ToolkitResult<Vec<String>> {
        self.call(NlpCommand::SpellCorrect(words.to_vec()))
    }

    fn pos_dependency_tag(&self, phrase: &str) -> ToolkitResult<Vec<TaggedToken>> {
        self.call(NlpCommand::PosTag(phrase.to_string()))
    }

    fn stem(&self, words: &[String]) -> ToolkitResult<Vec<String>> {
        self.call(NlpCommand::Stem(words.to_vec()))
    }

    fn known_verbs(&self) -> &HashSet<String> {
        &self.verbs
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn unavailable(err: WorkerError) -> ToolkitError {
    ToolkitError::Unavailable {
        reason: err.to_string(),
    }
}

fn request_failed(op: &str, err: WorkerError) -> ToolkitError {
    match err {
        WorkerError::WorkerResponseError { code, message } => ToolkitError::RequestFailed {
            op: op.to_string(),
            message: format!("{}: {}", code, message),
        },
        other => ToolkitError::RequestFailed {
            op: op.to_string(),
            message: other.to_string(),
        },
    }
}

fn decode<T: DeserializeOwned>(op: &str, data: &serde_json::Value, key: &str) -> ToolkitResult<T> {
    data.get(key)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| ToolkitError::UnexpectedReply { op: op.to_string() })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::find_python;
    use tempfile::TempDir;

    const FAKE_MODULE: &str = r#"
import os


class NLPUtilities:
    def __init__(self):
        self.segmenter = None
        self.checker = None
        self.tagger = None
        self.stemmer = None

    def initialize_segmenter(self):
        self.segmenter = True

    def initialize_spell_checker(self):
        self.checker = {"bal": "ball"}

    def initialize_spacy(self):
        self.tagger = True

    def initialize_stemmer(self):
        self.stemmer = True

    def initialize_verbs(self):
        return {"compute", "load"}

    def use_segmenter(self, identifier):
        if self.segmenter is None:
            raise RuntimeError("segmenter not initialized")
        if identifier == "crash_now":
            os._exit(3)
        out, word = [], ""
        for ch in identifier:
            if ch == "_" or (ch.isupper() and word):
                if word:
                    out.append(word.lower())
                word = "" if ch == "_" else ch
            else:
                word += ch
        if word:
            out.append(word.lower())
        return out

    def use_spell_checker(self, words):
        return [self.checker.get(w, w) for w in words]

    def use_pos_dependency_tagger(self, phrases):
        if self.tagger is None:
            raise RuntimeError("tagger not initialized")
        words = phrases[0].split()
        return [[{"word": w, "pos_tag": "VERB" if w == "compute" else "NOUN",
                  "role": "ROOT" if i == len(words) - 1 else "compound"}
                 for i, w in enumerate(words)]]

    def use_words_stemmer(self, words):
        if self.stemmer is None:
            raise RuntimeError("stemmer not initialized")
        return [{"stemmed": w[:-1] if w.endswith("e") else w} for w in words]
"#;

    /// Only the required methods; no optional initializers.
    const MINIMAL_MODULE: &str = r#"
class NLPUtilities:
    def use_segmenter(self, identifier):
        return identifier.split("_")

    def use_spell_checker(self, words):
        return words

    def use_pos_dependency_tagger(self, phrases):
        return [[{"word": w, "pos_tag": "NOUN", "role": "ROOT"} for w in phrases[0].split()]]

    def use_words_stemmer(self, words):
        return [{"stemmed": w} for w in words]

    def initialize_verbs(self):
        return ["get"]
"#;

    const BROKEN_INIT_MODULE: &str = r#"
class NLPUtilities:
    def initialize_spacy(self):
        raise OSError("model not downloaded")

    def initialize_verbs(self):
        return []
"#;

    fn start_module(source: &str) -> Option<(TempDir, ToolkitResult<NlpService>)> {
        let Some(python) = find_python() else {
            eprintln!("Skipping test: Python not found");
            return None;
        };
        let temp = TempDir::new().unwrap();
        let module = temp.path().join("fake_nlp.py");
        std::fs::write(&module, source).unwrap();
        let service = NlpService::start(&python.to_string_lossy(), &module.to_string_lossy());
        Some((temp, service))
    }

    fn start_fake() -> Option<(TempDir, NlpService)> {
        start_module(FAKE_MODULE).map(|(temp, service)| (temp, service.unwrap()))
    }

    #[test]
    fn test_missing_module_is_unavailable() {
        let Some(python) = find_python() else {
            eprintln!("Skipping test: Python not found");
            return;
        };
        let err = NlpService::start(&python.to_string_lossy(), "no_such_module_for_tugdoc").unwrap_err();
        assert!(matches!(err, ToolkitError::Unavailable { .. }));
    }

    #[test]
    fn test_client_round_trips_every_op() {
        let Some((_temp, service)) = start_fake() else {
            return;
        };
        let client = service.client();

        let words = client.segment("RoundBal").unwrap();
        assert_eq!(words, vec!["round".to_string(), "bal".to_string()]);
        let corrected = client.spell_correct(&words).unwrap();
        assert_eq!(corrected, vec!["round".to_string(), "ball".to_string()]);

        let tokens = client.pos_dependency_tag("round ball").unwrap();
        assert_eq!(tokens[1], TaggedToken::new("ball", "NOUN", "ROOT"));

        assert_eq!(client.stem(&["compute".to_string()]).unwrap(), vec!["comput".to_string()]);
        assert!(client.known_verbs().contains("load"));
    }

    #[test]
    fn test_clients_share_one_service_across_threads() {
        let Some((_temp, service)) = start_fake() else {
            return;
        };
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = service.client();
                thread::spawn(move || client.segment(&format!("load_item{}", i)).unwrap())
            })
            .collect();
        for handle in handles {
            let words = handle.join().unwrap();
            assert_eq!(words[0], "load");
        }
    }

    #[test]
    fn test_client_after_shutdown_is_unavailable() {
        let Some((_temp, mut service)) = start_fake() else {
            return;
        };
        let client = service.client();
        service.shutdown();
        let err = client.segment("anything").unwrap_err();
        assert!(matches!(err, ToolkitError::Unavailable { .. }));
    }

    #[test]
    fn test_initializers_run_before_first_request() {
        let Some((_temp, service)) = start_fake() else {
            return;
        };
        let client = service.client();
        assert_eq!(client.segment("load_item").unwrap(), vec!["load".to_string(), "item".to_string()]);
        assert_eq!(client.pos_dependency_tag("load").unwrap().len(), 1);
        assert_eq!(client.stem(&["load".to_string()]).unwrap(), vec!["load".to_string()]);
    }

    #[test]
    fn test_initializers_are_optional() {
        let Some((_temp, service)) = start_module(MINIMAL_MODULE) else {
            return;
        };
        let service = service.unwrap();
        let client = service.client();
        assert!(client.known_verbs().contains("get"));
        assert_eq!(client.segment("get_user").unwrap(), vec!["get".to_string(), "user".to_string()]);
    }

    #[test]
    fn test_failing_initializer_is_unavailable() {
        let Some((_temp, service)) = start_module(BROKEN_INIT_MODULE) else {
            return;
        };
        match service {
            Err(ToolkitError::Unavailable { reason }) => assert!(reason.contains("model not downloaded")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("service started with a failing initializer"),
        }
    }

    #[test]
    fn test_crashed_worker_is_restarted_on_next_request() {
        let Some((_temp, service)) = start_fake() else {
            return;
        };
        let client = service.client();
        let err = client.segment("crash_now").unwrap_err();
        assert!(matches!(err, ToolkitError::RequestFailed { .. }));

        let words = client.segment("RoundBal").unwrap();
        assert_eq!(words, vec!["round".to_string(), "bal".to_string()]);
        assert_eq!(client.spell_correct(&words).unwrap()[1], "ball");
    }
}
