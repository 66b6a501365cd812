//! Prometheus HTTP API 查询客户端
//!
//! 仅实现 `/api/v1/query` 与 `/api/v1/query_range` 两个接口，
//! 返回值保持原始的 `[timestamp, "value"]` 样本格式，由图表层自行解析。

use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{DateTime, TimeZone};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// 单个时间序列
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Series {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    /// matrix 结果的样本
    #[serde(default)]
    pub values: Vec<(f64, String)>,
    /// vector 结果的样本
    #[serde(default)]
    pub value: Option<(f64, String)>,
}

impl Series {
    /// 所有样本 (matrix 与 vector 统一视图)
    pub fn samples(&self) -> impl Iterator<Item = &(f64, String)> {
        self.values.iter().chain(self.value.iter())
    }

    /// 由标签拼出展示名称，如 `{guildId="1"}`；无标签时返回 `fallback`
    pub fn display_name(&self, fallback: &str) -> String {
        let labels: Vec<String> = self
            .metric
            .iter()
            .filter(|(k, _)| k.as_str() != "__name__")
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect();
        match (self.metric.get("__name__"), labels.is_empty()) {
            (Some(name), true) => name.clone(),
            (Some(name), false) => format!("{}{{{}}}", name, labels.join(", ")),
            (None, true) => fallback.to_string(),
            (None, false) => format!("{{{}}}", labels.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct QueryResult {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<Series>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.result.iter().all(|s| s.samples().next().is_none())
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    data: Option<QueryResult>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// 将 API 响应体解析为查询结果
pub fn decode_response(body: &[u8]) -> Result<QueryResult> {
    let envelope: ApiEnvelope =
        serde_json::from_slice(body).context("无法解析查询服务响应")?;

    if envelope.status != "success" {
        bail!(
            "查询失败 ({}): {}",
            envelope.error_type.as_deref().unwrap_or("unknown"),
            envelope.error.as_deref().unwrap_or("no error message")
        );
    }

    envelope
        .data
        .ok_or_else(|| anyhow!("查询服务响应缺少 data 字段"))
}

/// 转义 PromQL 标签值中的 `\` 与 `"`
pub fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub struct QueryClient {
    base: Url,
    http: reqwest::Client,
}

impl QueryClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(endpoint).with_context(|| format!("无效的查询地址: {}", endpoint))?;
        // 保证以 / 结尾，便于 join 相对路径
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("无法创建 HTTP 客户端")?;

        Ok(Self { base, http })
    }

    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    /// 区间查询 (`step_secs` 为采样步长，单位秒)
    pub async fn range_query<Tz: TimeZone>(
        &self,
        query: &str,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
        step_secs: u64,
    ) -> Result<QueryResult> {
        let url = self.build_url(
            "api/v1/query_range",
            &[
                ("query", query.to_string()),
                ("start", format_ts(start)),
                ("end", format_ts(end)),
                ("step", step_secs.to_string()),
            ],
        )?;
        debug!(target: "Query", "range_query: {}", url);
        self.fetch(url).await
    }

    /// 瞬时查询
    pub async fn instant_query<Tz: TimeZone>(
        &self,
        query: &str,
        time: &DateTime<Tz>,
    ) -> Result<QueryResult> {
        let url = self.build_url(
            "api/v1/query",
            &[("query", query.to_string()), ("time", format_ts(time))],
        )?;
        debug!(target: "Query", "instant_query: {}", url);
        self.fetch(url).await
    }

    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<QueryResult> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("查询服务请求失败")?;
        let status = resp.status();
        let body = resp.bytes().await.context("读取查询响应失败")?;

        // Prometheus 在 4xx/5xx 时同样返回 JSON 错误体，优先使用其中的信息
        match decode_response(&body) {
            Ok(result) => Ok(result),
            Err(e) if status.is_success() => Err(e),
            Err(_) => bail!("查询服务返回 HTTP {}", status),
        }
    }
}

fn format_ts<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    let millis = t.timestamp_millis();
    format!("{}.{:03}", millis.div_euclid(1000), millis.rem_euclid(1000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn decodes_matrix_response() {
        let body = br#"{
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {"guildId": "42"}, "values": [[1700000000, "3"], [1700001800, "5"]]}
                ]
            }
        }"#;
        let result = decode_response(body).unwrap();
        assert_eq!(result.result_type, "matrix");
        assert_eq!(result.result.len(), 1);
        assert_eq!(result.result[0].values[1], (1700001800.0, "5".to_string()));
        assert!(!result.is_empty());
    }

    #[test]
    fn decodes_vector_response() {
        let body = br#"{"status":"success","data":{"resultType":"vector","result":[
            {"metric":{"userId":"1","username":"Nawyjx"},"value":[1700000000.5,"46"]}]}}"#;
        let result = decode_response(body).unwrap();
        let series = &result.result[0];
        assert_eq!(series.samples().count(), 1);
        assert_eq!(series.value.as_ref().unwrap().1, "46");
    }

    #[test]
    fn error_envelope_becomes_error() {
        let body = br#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        let err = decode_response(body).unwrap_err().to_string();
        assert!(err.contains("bad_data"));
        assert!(err.contains("parse error"));
    }

    #[test]
    fn empty_result_is_empty() {
        let body = br#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;
        assert!(decode_response(body).unwrap().is_empty());
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn display_name_from_labels() {
        let mut s = Series::default();
        assert_eq!(s.display_name("count"), "count");
        s.metric.insert("guildId".into(), "1".into());
        assert_eq!(s.display_name("count"), r#"{guildId="1"}"#);
        s.metric.insert("__name__".into(), "message_length".into());
        assert_eq!(s.display_name("count"), r#"message_length{guildId="1"}"#);
    }

    #[test]
    fn urls_keep_base_path() {
        let client = QueryClient::new("http://localhost:9090/prom", Duration::from_secs(1)).unwrap();
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let url = client
            .build_url(
                "api/v1/query_range",
                &[("query", "up".to_string()), ("start", format_ts(&start))],
            )
            .unwrap();
        assert_eq!(url.path(), "/prom/api/v1/query_range");
        assert!(url.as_str().contains("start=1700000000.000"));
    }
}
