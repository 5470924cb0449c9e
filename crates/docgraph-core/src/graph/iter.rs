//! Lazy result iteration.

use docgraph_proto::{Element, Row};
use tracing::debug;

use crate::client::{GraphClient, RowStream};
use crate::decode::RowDecoder;
use crate::error::Error;
use crate::query::{AqlQuery, ResidualFilter};

enum State {
    /// Query not sent yet.
    Pending(AqlQuery),
    Running(RowStream),
    Done,
}

impl State {
    fn start<C: GraphClient>(&mut self, client: &C) -> Result<(), Error> {
        if !matches!(self, State::Pending(_)) {
            return Ok(());
        }
        if let State::Pending(query) = std::mem::replace(self, State::Done) {
            debug!(
                query = %query.text,
                bind_vars = query.bind_vars.len(),
                "executing query"
            );
            *self = State::Running(client.query(&query.text, &query.bind_vars)?);
        }
        Ok(())
    }

    fn next_json<C: GraphClient>(
        &mut self,
        client: &C,
    ) -> Option<Result<serde_json::Value, Error>> {
        if let Err(e) = self.start(client) {
            return Some(Err(e));
        }
        let State::Running(stream) = self else {
            return None;
        };
        match stream.next()? {
            Ok(row) => Some(Ok(row)),
            Err(e) => {
                *self = State::Done;
                Some(Err(e.into()))
            }
        }
    }
}

/// Elements of a scan, fetched on first pull and re-checked in-process.
///
/// The query is sent when `next` is first called. Iteration ends after the
/// first error.
pub struct ElementIter<'a, C> {
    client: &'a C,
    decoder: &'a RowDecoder,
    residual: Option<ResidualFilter>,
    state: State,
}

impl<'a, C: GraphClient> ElementIter<'a, C> {
    pub(crate) fn new(
        client: &'a C,
        decoder: &'a RowDecoder,
        query: AqlQuery,
        residual: Option<ResidualFilter>,
    ) -> Self {
        Self {
            client,
            decoder,
            residual,
            state: State::Pending(query),
        }
    }

    /// An iterator that yields nothing and never queries.
    pub(crate) fn empty(client: &'a C, decoder: &'a RowDecoder) -> Self {
        Self {
            client,
            decoder,
            residual: None,
            state: State::Done,
        }
    }

    fn accept(&self, element: &Element) -> Result<bool, Error> {
        match &self.residual {
            Some(residual) => residual.test(element),
            None => Ok(true),
        }
    }
}

impl<C: GraphClient> Iterator for ElementIter<'_, C> {
    type Item = Result<Element, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.state.next_json(self.client)? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            let checked = self
                .decoder
                .decode_element_row(&row)
                .and_then(|element| self.accept(&element).map(|keep| (element, keep)));
            match checked {
                Ok((element, true)) => return Some(Ok(element)),
                Ok((_, false)) => continue,
                Err(e) => {
                    self.state = State::Done;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Decoded rows of an ad-hoc query.
pub struct RowIter<'a> {
    decoder: &'a RowDecoder,
    stream: Option<RowStream>,
}

impl<'a> RowIter<'a> {
    pub(crate) fn new(decoder: &'a RowDecoder, stream: RowStream) -> Self {
        Self {
            decoder,
            stream: Some(stream),
        }
    }
}

impl Iterator for RowIter<'_> {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.stream.as_mut()?;
        let decoded = match stream.next()? {
            Ok(row) => self.decoder.decode(&row),
            Err(e) => Err(e.into()),
        };
        if decoded.is_err() {
            self.stream = None;
        }
        Some(decoded)
    }
}
