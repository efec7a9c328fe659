use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};

use crate::config::{Credentials, ServerConfig};
use crate::domain::{KeyValuePayload, MapAnnotationId, PlateId, PlateName, WellId, WellPosition};
use crate::error::AnnotateError;

const PAGE_SIZE: usize = 500;

pub trait OmeroClient: Send + Sync {
    fn resolve_plate(&self, name: &PlateName) -> Result<PlateId, AnnotateError>;
    fn resolve_well(
        &self,
        plate: PlateId,
        position: WellPosition,
    ) -> Result<WellId, AnnotateError>;
    fn map_annotation_ids(
        &self,
        well: WellId,
        namespace: &str,
    ) -> Result<Vec<MapAnnotationId>, AnnotateError>;
    fn create_map_annotation(
        &self,
        well: WellId,
        namespace: &str,
        payload: &KeyValuePayload,
    ) -> Result<MapAnnotationId, AnnotateError>;
    fn update_map_annotation(
        &self,
        id: MapAnnotationId,
        payload: &KeyValuePayload,
    ) -> Result<(), AnnotateError>;
}

/// Session against the OMERO JSON API. Login happens in [`connect`]; the
/// session cookie lives in the client's jar and logout is posted on drop.
///
/// [`connect`]: OmeroHttpClient::connect
pub struct OmeroHttpClient {
    client: Client,
    base: String,
    csrf: String,
}

impl OmeroHttpClient {
    pub fn connect(
        config: &ServerConfig,
        credentials: &Credentials,
    ) -> Result<Self, AnnotateError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("annotate-plate/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?;

        let base = config.base_url();

        let token_body: Value = handle_status(
            client
                .get(format!("{base}/api/v0/token/"))
                .send()
                .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?,
        )?
        .json()
        .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?;
        let csrf = token_body
            .get("data")
            .and_then(|value| value.as_str())
            .ok_or_else(|| AnnotateError::LoginFailed("no CSRF token in response".to_string()))?
            .to_string();

        let login_body: Value = handle_status(
            client
                .post(format!("{base}/api/v0/login/"))
                .header("X-CSRFToken", csrf.as_str())
                .header("Referer", base.as_str())
                .form(&[
                    ("username", credentials.username.as_str()),
                    ("password", credentials.password.as_str()),
                    ("server", "1"),
                    ("group", config.group.as_str()),
                ])
                .send()
                .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?,
        )?
        .json()
        .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?;
        if !login_body
            .get("success")
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
        {
            let message = login_body
                .get("message")
                .and_then(|value| value.as_str())
                .unwrap_or("server rejected the login")
                .to_string();
            return Err(AnnotateError::LoginFailed(message));
        }

        Ok(Self { client, base, csrf })
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, AnnotateError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?;
        handle_status(response)?
            .json()
            .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))
    }

    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<Value, AnnotateError> {
        let response = self
            .client
            .post(url)
            .header("X-CSRFToken", self.csrf.as_str())
            .header("Referer", self.base.as_str())
            .form(form)
            .send()
            .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))?;
        handle_status(response)?
            .json()
            .map_err(|err| AnnotateError::OmeroHttp(err.to_string()))
    }

    fn payload_json(payload: &KeyValuePayload) -> String {
        let pairs: Vec<Value> = payload
            .pairs()
            .iter()
            .map(|(key, value)| json!([key, value]))
            .collect();
        Value::Array(pairs).to_string()
    }
}

impl OmeroClient for OmeroHttpClient {
    fn resolve_plate(&self, name: &PlateName) -> Result<PlateId, AnnotateError> {
        // The plate listing has no server-side name filter to rely on, so
        // walk every page and match exact names client-side; a duplicate
        // name split across pages must still come out ambiguous.
        let url = format!("{}/api/v0/m/plates/", self.base);
        let mut matches = Vec::new();
        let mut offset = 0usize;
        loop {
            let body = self.get_json(
                &url,
                &[
                    ("offset", offset.to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                ],
            )?;
            let page_len = body
                .get("data")
                .and_then(|value| value.as_array())
                .map(|plates| plates.len())
                .unwrap_or_default();
            matches.extend(plate_matches(&body, name.as_str()));
            if page_len < PAGE_SIZE {
                break;
            }
            offset += page_len;
        }
        select_plate(&matches, name)
    }

    fn resolve_well(
        &self,
        plate: PlateId,
        position: WellPosition,
    ) -> Result<WellId, AnnotateError> {
        let url = format!("{}/api/v0/m/plates/{}/wells/", self.base, plate.as_i64());
        let mut offset = 0usize;
        loop {
            let body = self.get_json(
                &url,
                &[
                    ("offset", offset.to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                ],
            )?;
            let wells = body
                .get("data")
                .and_then(|value| value.as_array())
                .cloned()
                .unwrap_or_default();
            if wells.is_empty() {
                return Err(AnnotateError::WellNotFound {
                    plate: plate.as_i64(),
                    row: position.row,
                    column: position.column,
                });
            }
            for well in &wells {
                let row = well.get("Row").and_then(|value| value.as_u64());
                let column = well.get("Column").and_then(|value| value.as_u64());
                if row == Some(position.row as u64) && column == Some(position.column as u64) {
                    return well
                        .get("@id")
                        .and_then(|value| value.as_i64())
                        .map(WellId::new)
                        .ok_or_else(|| {
                            AnnotateError::OmeroHttp("well entry without an id".to_string())
                        });
                }
            }
            offset += wells.len();
        }
    }

    fn map_annotation_ids(
        &self,
        well: WellId,
        namespace: &str,
    ) -> Result<Vec<MapAnnotationId>, AnnotateError> {
        let body = self.get_json(
            &format!("{}/webclient/api/annotations/", self.base),
            &[
                ("type", "map".to_string()),
                ("well", well.as_i64().to_string()),
            ],
        )?;
        let ids = body
            .get("annotations")
            .and_then(|value| value.as_array())
            .map(|annotations| {
                annotations
                    .iter()
                    .filter(|annotation| {
                        annotation.get("ns").and_then(|value| value.as_str()) == Some(namespace)
                    })
                    .filter_map(|annotation| {
                        annotation.get("id").and_then(|value| value.as_i64())
                    })
                    .map(MapAnnotationId::new)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    fn create_map_annotation(
        &self,
        well: WellId,
        namespace: &str,
        payload: &KeyValuePayload,
    ) -> Result<MapAnnotationId, AnnotateError> {
        let body = self.post_form(
            &format!("{}/webclient/annotate_map/", self.base),
            &[
                ("well", well.as_i64().to_string()),
                ("ns", namespace.to_string()),
                ("mapAnnotation", Self::payload_json(payload)),
            ],
        )?;
        body.get("annId")
            .and_then(|value| value.as_i64())
            .map(MapAnnotationId::new)
            .ok_or_else(|| AnnotateError::OmeroHttp("no annotation id in response".to_string()))
    }

    fn update_map_annotation(
        &self,
        id: MapAnnotationId,
        payload: &KeyValuePayload,
    ) -> Result<(), AnnotateError> {
        self.post_form(
            &format!("{}/webclient/annotate_map/", self.base),
            &[
                ("annId", id.as_i64().to_string()),
                ("mapAnnotation", Self::payload_json(payload)),
            ],
        )?;
        Ok(())
    }
}

impl Drop for OmeroHttpClient {
    fn drop(&mut self) {
        // Best-effort logout; the session expires server-side regardless.
        let _ = self
            .client
            .post(format!("{}/webclient/logout/", self.base))
            .header("X-CSRFToken", self.csrf.as_str())
            .header("Referer", self.base.as_str())
            .send();
    }
}

fn plate_matches(page: &Value, name: &str) -> Vec<i64> {
    page.get("data")
        .and_then(|value| value.as_array())
        .map(|plates| {
            plates
                .iter()
                .filter(|plate| plate.get("Name").and_then(|value| value.as_str()) == Some(name))
                .filter_map(|plate| plate.get("@id").and_then(|value| value.as_i64()))
                .collect()
        })
        .unwrap_or_default()
}

fn select_plate(matches: &[i64], name: &PlateName) -> Result<PlateId, AnnotateError> {
    match matches {
        [] => Err(AnnotateError::PlateNotFound(name.to_string())),
        [id] => Ok(PlateId::new(*id)),
        _ => Err(AnnotateError::PlateAmbiguous(name.to_string())),
    }
}

fn handle_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, AnnotateError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "OMERO request failed".to_string());
    Err(AnnotateError::OmeroStatus { status, message })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn plate_matches_are_exact_on_name() {
        let page = json!({"data": [
            {"@id": 1, "Name": "PlateA"},
            {"@id": 2, "Name": "PlateA2"},
            {"@id": 3, "Name": "PlateA"},
        ]});
        assert_eq!(plate_matches(&page, "PlateA"), [1, 3]);
    }

    #[test]
    fn plate_matches_accumulate_across_pages() {
        let name: PlateName = "PlateA".parse().unwrap();
        let first = json!({"data": [{"@id": 1, "Name": "PlateA"}]});
        let second = json!({"data": [{"@id": 7, "Name": "PlateA"}]});

        let mut matches = plate_matches(&first, name.as_str());
        matches.extend(plate_matches(&second, name.as_str()));

        let err = select_plate(&matches, &name).unwrap_err();
        assert_matches!(err, AnnotateError::PlateAmbiguous(_));
    }

    #[test]
    fn select_plate_zero_one_many() {
        let name: PlateName = "PlateA".parse().unwrap();
        assert_matches!(
            select_plate(&[], &name).unwrap_err(),
            AnnotateError::PlateNotFound(_)
        );
        assert_eq!(select_plate(&[42], &name).unwrap(), PlateId::new(42));
        assert_matches!(
            select_plate(&[1, 2], &name).unwrap_err(),
            AnnotateError::PlateAmbiguous(_)
        );
    }

    #[test]
    fn payload_json_is_ordered_pairs() {
        let mut payload = KeyValuePayload::new();
        payload.push("individual", "X");
        payload.push("concentration", "0.5");
        assert_eq!(
            OmeroHttpClient::payload_json(&payload),
            r#"[["individual","X"],["concentration","0.5"]]"#
        );
    }
}
