//! Pipeline `input` steps waiting for an answer

use http::Method;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    client::Jenkins,
    error::{Error, Result},
    item::Item,
};

/// An `input` step a pipeline run is blocked on.
///
/// Built from one record of `wfapi/pendingInputActions`; the record is kept
/// as-is and answers [`inputs`](Self::inputs) and friends without a
/// further request.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInputAction {
    item: Item,
    raw: Value,
}

impl PendingInputAction {
    pub(crate) fn new(jenkins: &Jenkins, raw: Value) -> Result<Self> {
        let abort_url = raw
            .get("abortUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::missing_field("abortUrl", jenkins.root()))?;
        let base = abort_url
            .strip_suffix("abort")
            .unwrap_or(abort_url)
            .trim_start_matches('/');
        let url = format!("{}{base}", jenkins.root());
        Ok(Self {
            item: jenkins.item(url, "PendingInputAction"),
            raw,
        })
    }

    /// Step id.
    pub fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }

    /// Question shown to the user.
    pub fn message(&self) -> Option<&str> {
        self.raw.get("message").and_then(Value::as_str)
    }

    /// Label of the proceed button.
    pub fn proceed_text(&self) -> Option<&str> {
        self.raw.get("proceedText").and_then(Value::as_str)
    }

    /// Names of the parameters the step asks for.
    pub fn inputs(&self) -> Vec<&str> {
        self.raw
            .get("inputs")
            .and_then(Value::as_array)
            .map(|inputs| {
                inputs
                    .iter()
                    .filter_map(|input| input.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The record as returned by the server.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Reject the input, failing the run.
    pub async fn abort(&self) -> Result<()> {
        self.item.post("abort").await?;
        info!(input = %self.item.url(), "Aborted input");
        Ok(())
    }

    /// Answer the input.
    ///
    /// Without parameters the step proceeds with its defaults. With
    /// parameters every name must be one the step declares.
    pub async fn submit(&self, params: &[(&str, Value)]) -> Result<()> {
        if params.is_empty() {
            self.item.post("proceedEmpty").await?;
        } else {
            let form = self.submission(params)?;
            self.item
                .send(self.item.request(Method::POST, "submit").form(form))
                .await?;
        }
        info!(input = %self.item.url(), "Submitted input");
        Ok(())
    }

    fn submission(&self, params: &[(&str, Value)]) -> Result<[(&'static str, String); 2]> {
        let declared = self.inputs();
        let given: Vec<&str> = params.iter().map(|(name, _)| *name).collect();
        if declared.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "input takes no parameters, but got {given:?}"
            )));
        }
        if given.iter().any(|name| !declared.contains(name)) {
            return Err(Error::InvalidArgument(format!(
                "input takes parameters {declared:?}, but got {given:?}"
            )));
        }
        let parameter: Vec<Value> = params
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();
        Ok([
            ("proceed", self.proceed_text().unwrap_or_default().to_string()),
            ("json", json!({ "parameter": parameter }).to_string()),
        ])
    }
}

remote_item!(PendingInputAction);

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn action(inputs: Value) -> PendingInputAction {
        let jenkins = Jenkins::builder().base_url("http://ci/").build().unwrap();
        PendingInputAction::new(
            &jenkins,
            json!({
                "id": "Ok",
                "proceedText": "Proceed",
                "message": "Deploy?",
                "inputs": inputs,
                "abortUrl": "/job/p/1/input/Ok/abort"
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_url_from_abort_url() {
        let action = action(json!([]));
        assert_eq!(crate::item::RemoteItem::url(&action), "http://ci/job/p/1/input/Ok/");
    }

    #[test]
    fn test_submission_rejects_unknown_names() {
        let action = action(json!([{"name": "ENV", "type": "StringParameterDefinition"}]));
        assert_matches!(
            action.submission(&[("OTHER", json!("x"))]),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_submission_rejects_params_for_plain_input() {
        let action = action(json!([]));
        assert_matches!(
            action.submission(&[("ENV", json!("prod"))]),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_submission_form() {
        let action = action(json!([{"name": "ENV"}]));
        let [proceed, payload] = action.submission(&[("ENV", json!("prod"))]).unwrap();
        assert_eq!(proceed, ("proceed", "Proceed".to_string()));
        let payload: Value = serde_json::from_str(&payload.1).unwrap();
        assert_eq!(payload, json!({"parameter": [{"name": "ENV", "value": "prod"}]}));
    }
}
