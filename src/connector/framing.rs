//! Session header injection for outbound text frames.

use serde_json::Value;

use crate::{
    error::ConnectorError,
    message::{CONNECTION_ID_KEY, MessageContext},
    session::ConnectionId,
};

/// Ensure `context` carries a connection id and serialize it.
///
/// A caller-supplied `ConnectionId` entry is kept as-is provided it is a
/// non-empty string. Otherwise the `session` id is injected.
///
/// # Errors
///
/// - [`ConnectorError::InvalidSessionHeader`] if the header carries an empty
///   or non-string `ConnectionId`.
/// - [`ConnectorError::SessionPending`] if the header has no `ConnectionId`
///   and no session id has been assigned.
/// - [`ConnectorError::InvalidArgument`] if serialization fails.
pub(crate) fn prepare_outbound(
    context: &mut MessageContext,
    session: Option<&ConnectionId>,
) -> Result<String, ConnectorError> {
    match context.header().get(CONNECTION_ID_KEY) {
        Some(Value::String(id)) if !id.is_empty() => {}
        Some(_) => return Err(ConnectorError::InvalidSessionHeader),
        None => {
            let id = session.ok_or(ConnectorError::SessionPending)?;
            context
                .header_mut()
                .insert(CONNECTION_ID_KEY.to_owned(), Value::String(id.as_str().to_owned()));
        }
    }
    context.to_segment().map_err(ConnectorError::InvalidArgument)
}
