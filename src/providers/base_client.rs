use crate::core::error::EloyError;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Thin JSON-over-HTTP client shared by the completion providers.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth_header: Option<(String, String)>,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    pub fn new(
        base_url: String,
        auth_header: Option<(String, String)>,
        extra_headers: Option<HashMap<String, String>>,
        timeout: Duration,
    ) -> Result<Self, EloyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            extra_headers: extra_headers.unwrap_or_default(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Posts `payload` as JSON. Non-2xx responses are turned into
    /// `EloyError::Api` carrying the status and the response body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, EloyError> {
        let mut request = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json");

        if let Some((name, value)) = &self.auth_header {
            request = request.header(name, value);
        }
        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EloyError::Api(format!("HTTP {}: {}", status, body.trim())));
        }
        Ok(response)
    }

    /// Posts `payload` and yields the response body line by line, each line
    /// passed through `parser`. Lines the parser maps to `None` are dropped.
    pub async fn post_stream<T, P>(
        &self,
        path: &str,
        payload: &T,
        parser: P,
    ) -> Result<BoxStream<'static, Result<String, EloyError>>, EloyError>
    where
        T: Serialize + ?Sized,
        P: Fn(String) -> Result<Option<String>, EloyError> + Send + Sync + Copy + 'static,
    {
        let response = self.post(path, payload).await?;

        let lines = body_lines(response.bytes_stream().boxed());
        let stream = lines.filter_map(move |res| async move {
            match res {
                Ok(line) => parser(line).transpose(),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(stream.boxed())
    }
}

/// Reassembles complete `\n`-terminated lines from arbitrarily split body
/// chunks. Bytes are only decoded once a whole line is buffered, so a
/// multi-byte character cut by a chunk boundary stays intact.
pub fn body_lines<S, B, E>(body: S) -> impl Stream<Item = Result<String, EloyError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<EloyError> + Send + 'static,
{
    let decode = |bytes: Vec<u8>| {
        String::from_utf8(bytes)
            .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
            .map_err(|e| EloyError::Serialization(format!("Invalid UTF-8 in stream: {}", e)))
    };

    stream::unfold(
        (body, Vec::<u8>::new(), false),
        move |(mut body, mut buffer, mut finished)| async move {
            loop {
                if let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=end).collect();
                    return Some((decode(line), (body, buffer, finished)));
                }
                if finished {
                    if buffer.is_empty() {
                        return None;
                    }
                    let rest = std::mem::take(&mut buffer);
                    return Some((decode(rest), (body, buffer, finished)));
                }
                match body.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        buffer.clear();
                        return Some((Err(e.into()), (body, buffer, true)));
                    }
                    None => finished = true,
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_lines(chunks: Vec<&'static [u8]>) -> Vec<Result<String, EloyError>> {
        let body = stream::iter(chunks.into_iter().map(Ok::<_, EloyError>));
        body_lines(body).collect().await
    }

    #[tokio::test]
    async fn lines_split_across_chunks_are_rejoined() {
        let lines = collect_lines(vec![
            "data: Bom ".as_bytes(),
            "trabalho\n\nda".as_bytes(),
            "ta: fim".as_bytes(),
        ]).await;
        let lines: Vec<String> = lines.into_iter().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["data: Bom trabalho", "", "data: fim"]);
    }

    #[tokio::test]
    async fn multibyte_characters_survive_a_chunk_boundary() {
        let text = "data: já\n".as_bytes();
        let cut = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let (head, tail) = text.split_at(cut);
        let lines = collect_lines(vec![head, tail]).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap(), "data: já");
    }

    #[tokio::test]
    async fn transport_errors_end_the_stream() {
        let body = stream::iter(vec![
            Ok(b"data: meio".to_vec()),
            Err(EloyError::Network("connection reset".to_string())),
        ]);
        let lines: Vec<_> = body_lines(body).collect().await;
        assert_eq!(lines.len(), 1);
        assert!(matches!(lines[0], Err(EloyError::Network(_))));
    }
}
