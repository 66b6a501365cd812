use crate::event::Context;
use simd_json::derived::{ValueObjectAccess, ValueObjectAccessAsArray, ValueObjectAccessAsScalar};
use std::collections::HashMap;

pub struct CommandMatch {
    /// 指令名之后的纯文本参数 (已去除首尾空白)
    pub text: String,
}

pub fn get_prefixes(ctx: &Context) -> Vec<String> {
    ctx.config
        .read()
        .map(|c| c.command_prefix.clone())
        .unwrap_or_default()
}

/// 解析指令：跳过头部的 Reply/At/空白，匹配 [Prefix][Command]，返回参数文本
pub fn match_command(ctx: &Context, command_name: &str) -> Option<CommandMatch> {
    let prefixes = get_prefixes(ctx);
    let msg_arr = ctx.as_message()?.0.get_array("message")?;

    for (i, segment) in msg_arr.iter().enumerate() {
        match segment.get_str("type")? {
            "reply" | "at" => continue,
            "text" => {
                let raw_text = segment.get("data")?.get_str("text").unwrap_or("");
                // 跳过首部纯空白文本
                let trimmed_start = raw_text.trim_start();
                if trimmed_start.is_empty() {
                    continue;
                }

                let rest = strip_command(trimmed_start, &prefixes, command_name)?;

                // 后续文本节点一并拼入参数
                let mut text = rest.to_string();
                for seg in msg_arr.iter().skip(i + 1) {
                    if seg.get_str("type") == Some("text")
                        && let Some(t) = seg.get("data").and_then(|d| d.get_str("text"))
                    {
                        text.push_str(t);
                    }
                }

                return Some(CommandMatch {
                    text: text.trim().to_string(),
                });
            }
            // 遇到其他类型（如图片）且未匹配到指令，停止
            _ => return None,
        }
    }

    None
}

/// 匹配 `[prefix][name]`，要求指令名后紧跟空白或结尾，返回剩余部分
pub fn strip_command<'a>(text: &'a str, prefixes: &[String], name: &str) -> Option<&'a str> {
    let candidates: Vec<&str> = if prefixes.is_empty() {
        vec![""]
    } else {
        prefixes.iter().map(String::as_str).collect()
    };

    for prefix in candidates {
        let Some(after_prefix) = text.strip_prefix(prefix) else {
            continue;
        };
        let Some(rest) = after_prefix.strip_prefix(name) else {
            continue;
        };
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Some(rest);
        }
    }
    None
}

// ================= 选项解析 =================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// 正整数 (> 0)
    PosInt,
    Text,
}

pub struct OptionSpec {
    pub name: &'static str,
    pub short: char,
    pub kind: OptionKind,
}

impl OptionSpec {
    pub const fn new(name: &'static str, short: char, kind: OptionKind) -> Self {
        Self { name, short, kind }
    }
}

#[derive(Debug, Default)]
pub struct ParsedArgs {
    /// 去除选项后剩余的位置参数 (以单个空格连接)
    pub rest: String,
    options: HashMap<&'static str, String>,
}

impl ParsedArgs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(|v| v.parse().ok())
    }
}

/// 从参数文本中提取 `-x <value>` / `--name <value>` / `--name=value` 形式的选项
pub fn parse_options(text: &str, specs: &[OptionSpec]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut rest = Vec::new();
    let mut tokens = text.split_whitespace();

    while let Some(token) = tokens.next() {
        let (spec, inline_value) = if let Some(long) = token.strip_prefix("--") {
            let (key, value) = match long.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (long, None),
            };
            match specs.iter().find(|s| s.name == key) {
                Some(spec) => (spec, value),
                None => return Err(format!("未知选项: --{}", key)),
            }
        } else if let Some(short) = token.strip_prefix('-')
            && let Some(first) = short.chars().next()
            && !first.is_ascii_digit()
        {
            match specs.iter().find(|s| s.short == first) {
                Some(spec) => {
                    let tail = &short[first.len_utf8()..];
                    (spec, (!tail.is_empty()).then_some(tail))
                }
                None => return Err(format!("未知选项: -{}", first)),
            }
        } else {
            rest.push(token);
            continue;
        };

        let value = match inline_value {
            Some(v) => v.to_string(),
            None => tokens
                .next()
                .ok_or_else(|| format!("选项 {} 缺少参数", spec.name))?
                .to_string(),
        };

        validate_option(spec, &value)?;
        parsed.options.insert(spec.name, value);
    }

    parsed.rest = rest.join(" ");
    Ok(parsed)
}

fn validate_option(spec: &OptionSpec, value: &str) -> Result<(), String> {
    match spec.kind {
        OptionKind::PosInt => match value.parse::<u64>() {
            Ok(v) if v > 0 => Ok(()),
            _ => Err(format!("选项 {} 需要正整数，收到: {}", spec.name, value)),
        },
        OptionKind::Text => Ok(()),
    }
}
