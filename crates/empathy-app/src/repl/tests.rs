use std::sync::Arc;

use empathy_ai::{
    Engine, GenerationError, LanguageModel, Session, SharedSession, TextTokenizer, TokenId,
};

use super::ChatApp;

const EOT: TokenId = 0;

/// One token per byte, shifted past the marker.
struct ByteTokenizer;

impl TextTokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, GenerationError> {
        Ok(text.bytes().map(|b| TokenId::from(b) + 1).collect())
    }

    fn decode(&self, tokens: &[TokenId], _skip_special: bool) -> Result<String, GenerationError> {
        let bytes: Vec<u8> = tokens
            .iter()
            .filter(|&&t| t != EOT)
            .map(|&t| (t - 1) as u8)
            .collect();
        String::from_utf8(bytes).map_err(|e| GenerationError::Tokenizer(e.to_string()))
    }

    fn end_of_turn(&self) -> TokenId {
        EOT
    }
}

/// Replies with the user's last message reversed.
struct MirrorModel;

impl LanguageModel for MirrorModel {
    fn generate(
        &self,
        input: &[TokenId],
        _max_length: usize,
        pad: TokenId,
    ) -> Result<Vec<TokenId>, GenerationError> {
        let body = &input[..input.len() - 1];
        let start = body.iter().rposition(|&t| t == EOT).map_or(0, |p| p + 1);
        let mut output = input.to_vec();
        output.extend(body[start..].iter().rev());
        output.push(pad);
        Ok(output)
    }
}

struct BrokenModel;

impl LanguageModel for BrokenModel {
    fn generate(
        &self,
        _input: &[TokenId],
        _max_length: usize,
        _pad: TokenId,
    ) -> Result<Vec<TokenId>, GenerationError> {
        Err(GenerationError::Model("device lost".into()))
    }
}

fn shared(model: Arc<dyn LanguageModel>) -> SharedSession {
    let engine = Arc::new(Engine::new(Arc::new(ByteTokenizer), model));
    Session::new(engine).into_shared()
}

async fn run(app: &ChatApp, input: &str) -> String {
    let mut out = Vec::new();
    app.run(input.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn greets_then_answers() {
    let session = shared(Arc::new(MirrorModel));
    let app = ChatApp::new(session.clone());

    let out = run(&app, "Hello\n").await;

    assert!(out.starts_with("EmpathyBot:\n  | Hi there."));
    assert!(out.contains("You:\n  | Hello\n"));
    assert!(out.contains("EmpathyBot:\n  | olleH\n"));
    assert_eq!(session.lock().await.turn_count(), 3);
}

#[tokio::test]
async fn blank_lines_are_ignored() {
    let session = shared(Arc::new(MirrorModel));
    let app = ChatApp::new(session.clone());

    run(&app, "\n   \n").await;

    assert_eq!(session.lock().await.turn_count(), 1);
}

#[tokio::test]
async fn quit_stops_reading() {
    let session = shared(Arc::new(MirrorModel));
    let app = ChatApp::new(session.clone());

    run(&app, "/quit\nHello\n").await;

    assert_eq!(session.lock().await.turn_count(), 1);
}

#[tokio::test]
async fn failures_render_inline_and_chat_continues() {
    let session = shared(Arc::new(BrokenModel));
    let app = ChatApp::new(session.clone());

    let out = run(&app, "Hello\nStill there?\n").await;

    assert_eq!(out.matches("couldn't come up with a reply").count(), 2);
    assert!(out.contains("device lost"));
    // user turns are kept, no replies were added
    assert_eq!(session.lock().await.turn_count(), 3);
}

#[tokio::test]
async fn reset_starts_over() {
    let session = shared(Arc::new(MirrorModel));
    let app = ChatApp::new(session.clone());

    let out = run(&app, "Hello\n/reset\n").await;

    assert!(out.contains("Started a new conversation."));
    let session = session.lock().await;
    assert_eq!(session.turn_count(), 1);
    assert!(session.context().is_none());
}

#[tokio::test]
async fn stats_and_unknown_commands() {
    let session = shared(Arc::new(MirrorModel));
    let app = ChatApp::new(session);

    let out = run(&app, "abc\n/stats\n/dance\n").await;

    assert!(out.contains("turns:            3"));
    assert!(out.contains("replies:          1"));
    assert!(out.contains("Unknown command /dance"));
}

#[tokio::test]
async fn json_history_is_printed_at_exit() {
    let session = shared(Arc::new(MirrorModel));
    let app = ChatApp::new(session).with_json_history(true);

    let out = run(&app, "hey\n").await;

    let json_start = out.find('[').unwrap();
    let value: serde_json::Value = serde_json::from_str(&out[json_start..]).unwrap();
    let turns = value.as_array().unwrap();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1]["role"], "user");
    assert_eq!(turns[2]["text"], "yeh");
}
