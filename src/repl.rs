//! Terminal session endpoints.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

use shivai_runtime::{AgentResult, Reply, UtteranceSink, UtteranceSource};

const PROMPT: &[u8] = b"> ";

/// Reads one utterance per line from stdin.
pub(crate) struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
    prompt: bool,
}

impl StdinSource {
    pub(crate) fn new(prompt: bool) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            prompt,
        }
    }
}

#[async_trait]
impl UtteranceSource for StdinSource {
    async fn next_utterance(&mut self) -> AgentResult<Option<String>> {
        if self.prompt {
            let mut out = tokio::io::stdout();
            out.write_all(PROMPT).await?;
            out.flush().await?;
        }
        Ok(self.lines.next_line().await?)
    }
}

/// Prints each reply on its own line.
pub(crate) struct StdoutSink {
    out: Stdout,
}

impl StdoutSink {
    pub(crate) fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }
}

#[async_trait]
impl UtteranceSink for StdoutSink {
    async fn deliver(&mut self, reply: &Reply) -> AgentResult<()> {
        let line = format!("{}\n", reply.text());
        self.out.write_all(line.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}
