//! Line-oriented operator prompts.
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R, W> Prompt<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub async fn say(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .await
            .context("failed to write prompt")?;
        self.output.flush().await.context("failed to flush prompt")
    }

    /// Next line without its terminator; `None` at end of input.
    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .await
            .context("failed to read input")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Print `question` and return the trimmed answer.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.say(question).await?;
        Ok(self.read_line().await?.map(|l| l.trim().to_string()))
    }

    /// Collect trimmed links until a blank line. `None` when input ended
    /// before anything was read.
    pub async fn read_link_group(&mut self) -> Result<Option<Vec<String>>> {
        let mut links = Vec::new();
        loop {
            match self.read_line().await? {
                None if links.is_empty() => return Ok(None),
                None => return Ok(Some(links)),
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        return Ok(Some(links));
                    }
                    links.push(line.to_string());
                }
            }
        }
    }

    /// Yes only for an explicit `y` (any case); end of input is no.
    pub async fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(matches!(self.ask(question).await?, Some(a) if a.eq_ignore_ascii_case("y")))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn prompt(input: &'static str) -> Prompt<BufReader<&'static [u8]>, Vec<u8>> {
        Prompt::new(BufReader::new(input.as_bytes()), Vec::new())
    }

    #[tokio::test]
    async fn link_group_ends_at_blank_line() {
        let mut p = prompt("https://a/comments/1/\n  https://b/comments/2/  \n\nnext\n");
        let links = p.read_link_group().await.unwrap().unwrap();
        assert_eq!(links, vec!["https://a/comments/1/", "https://b/comments/2/"]);
        let rest = p.read_link_group().await.unwrap().unwrap();
        assert_eq!(rest, vec!["next"]);
        assert_eq!(p.read_link_group().await.unwrap(), None);
    }

    #[tokio::test]
    async fn blank_first_line_is_empty_group() {
        let mut p = prompt("\r\n");
        assert_eq!(p.read_link_group().await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn confirm_accepts_only_y() {
        let mut p = prompt("Y\nyes\n");
        assert!(p.confirm("more? ").await.unwrap());
        assert!(!p.confirm("more? ").await.unwrap());
        assert!(!p.confirm("more? ").await.unwrap());
        let out = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(out, "more? more? more? ");
    }

    #[tokio::test]
    async fn ask_trims_answer() {
        let mut p = prompt("  hello there \n");
        assert_eq!(p.ask("> ").await.unwrap(), Some("hello there".into()));
        assert_eq!(p.ask("> ").await.unwrap(), None);
    }
}
