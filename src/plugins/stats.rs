use crate::adapters::onebot::{LockedWriter, send_msg};
use crate::chart::month::month_range;
use crate::chart::options::{
    RankRow, format_heatmap_data, heatmap_option, line_option, rank_option,
};
use crate::command::{OptionKind, OptionSpec, match_command, parse_options};
use crate::config::build_config;
use crate::daterange::{DateRange, parse_range};
use crate::event::Context;
use crate::message::Message;
use crate::plugins::{PluginError, get_config};
use crate::query::{QueryResult, escape_label};
use anyhow::anyhow;
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use toml::Value;

// ================= 配置定义 =================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Prometheus 兼容查询服务地址
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 记录消息的指标名
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_step_minutes")]
    pub default_step_minutes: u64,
    #[serde(default = "default_rank_limit")]
    pub rank_limit: u64,
    #[serde(default = "default_true")]
    pub show_avatar: bool,
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://127.0.0.1:9090".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_metric() -> String {
    "message_length".to_string()
}

fn default_step_minutes() -> u64 {
    30
}

fn default_rank_limit() -> u64 {
    20
}

fn default_chart_width() -> u32 {
    1200
}

fn default_chart_height() -> u32 {
    800
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            metric: default_metric(),
            default_step_minutes: default_step_minutes(),
            rank_limit: default_rank_limit(),
            show_avatar: true,
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
        }
    }
}

pub fn default_config() -> Value {
    build_config(StatsConfig::default())
}

const CHAT_OPTIONS: [OptionSpec; 1] = [OptionSpec::new("step", 's', OptionKind::PosInt)];
const RANK_OPTIONS: [OptionSpec; 1] = [OptionSpec::new("limit", 'n', OptionKind::PosInt)];

/// 日历热力图画布 (7 列 60px 格子 + 两侧留白)
const HEATMAP_SIZE: (u32, u32) = (600, 650);
const AVATAR_URL: &str = "https://q1.qlogo.cn/g?b=qq&nk={}&s=640";
const NO_DATA: &str = "暂无数据";
/// 排行行数上限，保证画布高度不超过 4096
const MAX_RANK_LIMIT: u64 = 80;

// ================= 插件入口 =================

pub fn handle(
    ctx: Context,
    writer: LockedWriter,
) -> BoxFuture<'static, Result<Option<Context>, PluginError>> {
    Box::pin(async move {
        let (command, cmd) = if let Some(cmd) = match_command(&ctx, "stats.chat") {
            (Command::Chat, cmd)
        } else if let Some(cmd) = match_command(&ctx, "stats.rank") {
            (Command::Rank, cmd)
        } else if let Some(cmd) = match_command(&ctx, "stats.heatmap") {
            (Command::Heatmap, cmd)
        } else {
            return Ok(Some(ctx));
        };

        let Some(msg) = ctx.as_message() else {
            return Ok(Some(ctx));
        };
        let user_id = msg.user_id();
        let Some(group_id) = msg.group_id() else {
            send_msg(&ctx, writer, None, Some(user_id), "请在群聊中使用该指令。").await?;
            return Ok(None);
        };

        let config: StatsConfig = get_config(&ctx, "stats").unwrap_or_default();
        info!(
            target: "Plugin/Stats",
            "Req: {:?} group={} args=\"{}\"",
            command, group_id, cmd.text
        );

        let reply = match command.run(&ctx, &config, group_id, &cmd.text).await {
            Ok(reply) => reply,
            Err(Failure::Input(text)) => Message::new().text(text),
            Err(Failure::Empty) => Message::new().text(NO_DATA),
            Err(Failure::Internal(e)) => {
                error!(target: "Plugin/Stats", "{:?} 生成失败: {:#}", command, e);
                Message::new().text(format!("生成失败: {}", e))
            }
        };

        send_msg(&ctx, writer, Some(group_id), Some(user_id), reply).await?;
        Ok(None)
    })
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Chat,
    Rank,
    Heatmap,
}

enum Failure {
    /// 参数错误，原样回复给用户
    Input(String),
    /// 查询结果为空
    Empty,
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Internal(e)
    }
}

impl Command {
    async fn run(
        self,
        ctx: &Context,
        config: &StatsConfig,
        group_id: i64,
        args: &str,
    ) -> Result<Message, Failure> {
        let guild = group_id.to_string();
        let png = match self {
            Command::Chat => chat(ctx, config, &guild, args).await?,
            Command::Rank => rank(ctx, config, &guild, args).await?,
            Command::Heatmap => heatmap(ctx, config, &guild, args).await?,
        };
        Ok(Message::new().png(&png))
    }
}

// ================= 指令实现 =================

/// 聊天频次折线图
async fn chat(
    ctx: &Context,
    config: &StatsConfig,
    guild: &str,
    args: &str,
) -> Result<Vec<u8>, Failure> {
    let args = parse_options(args, &CHAT_OPTIONS).map_err(Failure::Input)?;
    let range = parse_range(&args.rest, &Local::now()).map_err(Failure::Input)?;
    let step_secs = args.get_u64("step").unwrap_or(config.default_step_minutes).max(1) * 60;

    let query = chat_query(&config.metric, guild);
    let result = ctx
        .query
        .range_query(&query, &range.start, &range.end, step_secs)
        .await?;
    if result.is_empty() {
        return Err(Failure::Empty);
    }

    let option = line_option(
        &result,
        &chat_title(&range),
        range.start.timestamp_millis(),
        range.end.timestamp_millis(),
        step_secs,
    );
    let png = ctx
        .charts
        .create_chart_png(Some(config.chart_width), Some(config.chart_height), option, None)
        .await?;
    Ok(png)
}

/// 发言排行榜
async fn rank(
    ctx: &Context,
    config: &StatsConfig,
    guild: &str,
    args: &str,
) -> Result<Vec<u8>, Failure> {
    let args = parse_options(args, &RANK_OPTIONS).map_err(Failure::Input)?;
    let range = parse_range(&args.rest, &Local::now()).map_err(Failure::Input)?;
    let limit = args
        .get_u64("limit")
        .unwrap_or(config.rank_limit)
        .clamp(1, MAX_RANK_LIMIT);

    let query = rank_query(&config.metric, guild, limit, range.seconds().max(1));
    let result = ctx.query.instant_query(&query, &range.end).await?;
    let rows = rank_rows(&result, config.show_avatar);
    if rows.is_empty() {
        return Err(Failure::Empty);
    }

    let label = if args.rest.is_empty() { "今日" } else { args.rest.as_str() };
    let height = rank_height(rows.len());
    let option = rank_option(&format!("本群发言排行 ({})", label), &rows);
    let png = ctx
        .charts
        .create_chart_png(Some(config.chart_width), Some(height), option, None)
        .await?;
    Ok(png)
}

/// 月度日历热力图
async fn heatmap(
    ctx: &Context,
    config: &StatsConfig,
    guild: &str,
    args: &str,
) -> Result<Vec<u8>, Failure> {
    let (year, month) = parse_year_month(args).map_err(Failure::Input)?;
    let range = month_range(year, month, Utc::now())
        .ok_or_else(|| Failure::Input("无效的年月".to_string()))?;
    let (start, end) = match (range.start_time(), range.end_time()) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(anyhow!("无法计算 {} 的时间范围", range.label).into()),
    };

    // 每天 23:59:59 取一次过去 24 小时的计数
    let first_sample = start + chrono::Duration::seconds(86_399);
    let query = heatmap_query(&config.metric, guild);
    let result = ctx
        .query
        .range_query(&query, &first_sample, &end, 86_400)
        .await?;
    if result.is_empty() {
        return Err(Failure::Empty);
    }

    let option = heatmap_option(format_heatmap_data(&result), &range.label);
    let png = ctx
        .charts
        .create_chart_png(Some(HEATMAP_SIZE.0), Some(HEATMAP_SIZE.1), option, None)
        .await?;
    Ok(png)
}

// ================= 查询与数据整理 =================

fn selector(metric: &str, guild: &str) -> String {
    format!("{}{{guildId=\"{}\"}}", metric, escape_label(guild))
}

pub fn chat_query(metric: &str, guild: &str) -> String {
    format!("count({})", selector(metric, guild))
}

pub fn rank_query(metric: &str, guild: &str, limit: u64, range_secs: i64) -> String {
    format!(
        "topk({}, sum by (userId, username) (count_over_time({}[{}s])))",
        limit,
        selector(metric, guild),
        range_secs
    )
}

pub fn heatmap_query(metric: &str, guild: &str) -> String {
    format!("sum(count_over_time({}[1d]))", selector(metric, guild))
}

fn chat_title<Tz: TimeZone>(range: &DateRange<Tz>) -> String {
    let iso = |t: &DateTime<Tz>| {
        t.with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    };
    format!("本群聊天频次 ({} - {})", iso(&range.start), iso(&range.end))
}

/// 把瞬时查询结果整理成排行 (按数值降序)
pub fn rank_rows(result: &QueryResult, show_avatar: bool) -> Vec<RankRow> {
    let mut rows: Vec<RankRow> = result
        .result
        .iter()
        .filter_map(|series| {
            let (_, raw) = series.samples().last()?;
            let value = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
            let user_id = series.metric.get("userId").filter(|s| !s.is_empty());
            let name = series
                .metric
                .get("username")
                .filter(|s| !s.is_empty())
                .or(user_id)
                .cloned()
                .unwrap_or_else(|| "未知".to_string());

            let row = RankRow::new(name, value);
            Some(match user_id {
                Some(id) if show_avatar => row.with_avatar(AVATAR_URL.replace("{}", id)),
                _ => row,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.value.total_cmp(&a.value));
    rows
}

fn rank_height(rows: usize) -> u32 {
    (160 + rows as u32 * 48).max(400)
}

/// 解析 `[year] [month]`，缺省部分返回 None
fn parse_year_month(args: &str) -> Result<(Option<i32>, Option<u32>), String> {
    let mut parts = args.split_whitespace();
    let year = parts
        .next()
        .map(|s| s.parse::<i32>().map_err(|_| format!("无效的年份: {}", s)))
        .transpose()?;
    let month = parts
        .next()
        .map(|s| s.parse::<u32>().map_err(|_| format!("无效的月份: {}", s)))
        .transpose()?;

    if let Some(y) = year
        && !(1970..=9999).contains(&y)
    {
        return Err(format!("年份需在 1970 到 9999 之间，收到: {}", y));
    }
    if let Some(m) = month
        && !(1..=12).contains(&m)
    {
        return Err(format!("月份需在 1 到 12 之间，收到: {}", m));
    }
    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Series, decode_response};

    #[test]
    fn queries_escape_guild_label() {
        assert_eq!(
            chat_query("message_length", "123"),
            r#"count(message_length{guildId="123"})"#
        );
        assert_eq!(
            rank_query("m", "1", 20, 86400),
            r#"topk(20, sum by (userId, username) (count_over_time(m{guildId="1"}[86400s])))"#
        );
        assert_eq!(
            heatmap_query("m", r#"a"b"#),
            r#"sum(count_over_time(m{guildId="a\"b"}[1d]))"#
        );
    }

    #[test]
    fn rank_rows_sorted_with_avatars() {
        let body = br#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"userId": "10001", "username": ""}, "value": [1700000000, "5"]},
                    {"metric": {"userId": "10002", "username": "Evelyn"}, "value": [1700000000, "12"]},
                    {"metric": {}, "value": [1700000000, "NaN"]}
                ]
            }
        }"#;
        let result = decode_response(body).unwrap();

        let rows = rank_rows(&result, true);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Evelyn");
        assert_eq!(rows[0].value, 12.0);
        assert_eq!(
            rows[0].avatar.as_deref(),
            Some("https://q1.qlogo.cn/g?b=qq&nk=10002&s=640")
        );
        assert_eq!(rows[1].name, "10001");

        let rows = rank_rows(&result, false);
        assert!(rows.iter().all(|r| r.avatar.is_none()));
    }

    #[test]
    fn rank_row_without_user_id() {
        let result = QueryResult {
            result_type: "vector".to_string(),
            result: vec![Series {
                value: Some((0.0, "3".to_string())),
                ..Default::default()
            }],
        };
        let rows = rank_rows(&result, true);
        assert_eq!(rows[0].name, "未知");
        assert!(rows[0].avatar.is_none());
    }

    #[test]
    fn year_month_validation() {
        assert_eq!(parse_year_month(""), Ok((None, None)));
        assert_eq!(parse_year_month("2024"), Ok((Some(2024), None)));
        assert_eq!(parse_year_month("2024 5"), Ok((Some(2024), Some(5))));
        assert!(parse_year_month("2024 13").is_err());
        assert!(parse_year_month("2024 0").is_err());
        assert!(parse_year_month("1969").is_err());
        assert!(parse_year_month("abc").is_err());
    }

    #[test]
    fn chat_title_uses_utc_iso() {
        let range = DateRange {
            start: Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 14, 15, 30, 0).unwrap(),
        };
        assert_eq!(
            chat_title(&range),
            "本群聊天频次 (2024-03-14T00:00:00.000Z - 2024-03-14T15:30:00.000Z)"
        );
    }

    #[test]
    fn rank_height_grows_with_rows() {
        assert_eq!(rank_height(1), 400);
        assert_eq!(rank_height(20), 1120);
        assert!(rank_height(MAX_RANK_LIMIT as usize) <= 4096);
    }

    #[test]
    fn config_defaults() {
        let cfg: StatsConfig = StatsConfig::deserialize(default_config()).unwrap();
        assert_eq!(cfg.endpoint, "http://127.0.0.1:9090");
        assert_eq!(cfg.metric, "message_length");
        assert_eq!(cfg.default_step_minutes, 30);
        assert_eq!((cfg.chart_width, cfg.chart_height), (1200, 800));
    }

    // ================= 指令流程 =================

    use crate::adapters::onebot::LockedWriter;
    use crate::chart::ChartService;
    use crate::config::AppConfig;
    use crate::event::{BotStatus, EventType};
    use crate::plugins::{self, echarts::EChartsConfig};
    use crate::query::QueryClient;
    use futures_util::Sink;
    use simd_json::OwnedValue;
    use simd_json::base::{ValueAsArray, ValueAsScalar};
    use simd_json::derived::{ValueObjectAccess, ValueObjectAccessAsScalar};
    use std::pin::Pin;
    use std::sync::{Arc, Mutex, RwLock};
    use std::task::Poll;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex as AsyncMutex;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

    const EMPTY_VECTOR: &str = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
    const MAY_MATRIX: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[
        {"metric":{},"values":[[1714607999,"12"],[1714694399,"3"]]}]}}"#;

    /// 记录写往连接的帧
    #[derive(Clone, Default)]
    struct CaptureSink(Arc<Mutex<Vec<String>>>);

    impl Sink<WsMessage> for CaptureSink {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: WsMessage) -> Result<(), WsError> {
            if let WsMessage::Text(text) = item {
                self.0.lock().unwrap().push(text.as_str().to_string());
            }
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    /// 对每个请求都返回同一份 JSON，并记录请求行
    async fn canned_prometheus(body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                let line = head.lines().next().unwrap_or("").to_string();
                seen.lock().unwrap().push(line);

                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}", addr), requests)
    }

    async fn test_context(endpoint: &str, event: String) -> Context {
        let dir = std::env::temp_dir().join(format!("ayjx-stats-cmd-{}", std::process::id()));
        let charts = ChartService::new(EChartsConfig {
            themes_dir: dir.join("themes").to_string_lossy().into_owned(),
            avatar_dir: String::new(),
            ..EChartsConfig::default()
        })
        .await
        .unwrap();

        let mut config = AppConfig::default();
        config.merge_plugin_defaults(plugins::default_configs());
        if let Some(Value::Table(t)) = config.plugins.get_mut("stats") {
            t.insert("show_avatar".to_string(), Value::Boolean(false));
        }

        let mut bytes = event.into_bytes();
        let event = simd_json::to_owned_value(&mut bytes).unwrap();
        Context {
            event: EventType::Onebot(event),
            config: Arc::new(RwLock::new(config)),
            config_path: String::new(),
            charts: Arc::new(charts),
            query: Arc::new(QueryClient::new(endpoint, Duration::from_secs(5)).unwrap()),
            bot: BotStatus::default(),
        }
    }

    fn group_message(text: &str) -> String {
        format!(
            r#"{{"post_type":"message","message_type":"group","group_id":123,"user_id":7,"raw_message":"{0}","message":[{{"type":"text","data":{{"text":"{0}"}}}}]}}"#,
            text
        )
    }

    fn private_message(text: &str) -> String {
        format!(
            r#"{{"post_type":"message","message_type":"private","user_id":7,"raw_message":"{0}","message":[{{"type":"text","data":{{"text":"{0}"}}}}]}}"#,
            text
        )
    }

    /// 跑一遍插件流水线，返回最终写出的唯一一帧
    async fn run_command(ctx: Context) -> OwnedValue {
        let sink = CaptureSink::default();
        let frames = sink.0.clone();
        let writer: LockedWriter = Arc::new(AsyncMutex::new(Box::new(sink)));
        plugins::run(ctx, writer).await.unwrap();

        let mut frames = frames.lock().unwrap().clone();
        assert_eq!(frames.len(), 1, "{:?}", frames);
        let mut bytes = frames.remove(0).into_bytes();
        simd_json::to_owned_value(&mut bytes).unwrap()
    }

    fn reply_text(frame: &OwnedValue) -> String {
        let message = frame.get("params").and_then(|p| p.get("message")).unwrap();
        if let Some(s) = message.as_str() {
            return s.to_string();
        }
        message
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|seg| seg.get("data").and_then(|d| d.get_str("text")))
            .collect()
    }

    fn reply_image(frame: &OwnedValue) -> Option<String> {
        let message = frame.get("params").and_then(|p| p.get("message"))?;
        message.as_array()?.iter().find_map(|seg| {
            (seg.get_str("type") == Some("image"))
                .then(|| seg.get("data").and_then(|d| d.get_str("file")).map(String::from))
                .flatten()
        })
    }

    #[tokio::test]
    async fn private_chat_is_rejected() {
        let (endpoint, requests) = canned_prometheus(EMPTY_VECTOR).await;
        let ctx = test_context(&endpoint, private_message("/stats.rank")).await;

        let frame = run_command(ctx).await;
        let params = frame.get("params").unwrap();
        assert_eq!(params.get_str("message_type"), Some("private"));
        assert_eq!(params.get_i64("user_id"), Some(7));
        assert_eq!(reply_text(&frame), "请在群聊中使用该指令。");
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_result_replies_no_data() {
        let (endpoint, requests) = canned_prometheus(EMPTY_VECTOR).await;
        let ctx = test_context(&endpoint, group_message("/stats.rank 本周")).await;

        let frame = run_command(ctx).await;
        assert_eq!(frame.get_str("action"), Some("send_msg"));
        assert_eq!(frame.get("params").unwrap().get_i64("group_id"), Some(123));
        assert_eq!(reply_text(&frame), NO_DATA);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("GET /api/v1/query?"), "{}", requests[0]);
    }

    #[tokio::test]
    async fn bad_month_is_reported_without_querying() {
        let (endpoint, requests) = canned_prometheus(MAY_MATRIX).await;
        let ctx = test_context(&endpoint, group_message("/stats.heatmap 2024 13")).await;

        let frame = run_command(ctx).await;
        assert_eq!(reply_text(&frame), "月份需在 1 到 12 之间，收到: 13");
        assert!(reply_image(&frame).is_none());
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_range_is_reported() {
        let (endpoint, requests) = canned_prometheus(EMPTY_VECTOR).await;
        let ctx = test_context(&endpoint, group_message("/stats.chat 2024-01-07 ~ 2024-01-01")).await;

        let frame = run_command(ctx).await;
        assert_eq!(reply_text(&frame), "起始时间必须早于结束时间");
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn heatmap_samples_end_of_each_day() {
        let (endpoint, requests) = canned_prometheus(MAY_MATRIX).await;
        let ctx = test_context(&endpoint, group_message("/stats.heatmap 2024 5")).await;

        let frame = run_command(ctx).await;
        let image = reply_image(&frame).expect("heatmap image");
        assert!(image.starts_with("base64://"));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let line = &requests[0];
        assert!(line.starts_with("GET /api/v1/query_range?"), "{}", line);
        // 2024-05-01T23:59:59Z 到 2024-05-31T23:59:59Z，每天一个点
        assert!(line.contains("start=1714607999.000"), "{}", line);
        assert!(line.contains("end=1717199999.000"), "{}", line);
        assert!(line.contains("step=86400"), "{}", line);
    }
}
