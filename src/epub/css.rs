//! CSS解析模块
//!
//! 只支持选择器块语法：`选择器 { 属性: 值; ... }`。没有组合器、伪类和层叠计算，
//! 查找按选择器字符串完全匹配。逗号分隔的选择器组会拆开分别登记。

use crate::epub::content::{Align, Edges};
use std::collections::HashMap;

/// 属性名 → 原始值
pub type Declarations = HashMap<String, String>;

/// 选择器 → 声明表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    rules: HashMap<String, Declarations>,
}

impl Stylesheet {
    /// 解析CSS文本
    ///
    /// 空文本或格式错误的规则不会报错，只是不产生条目。
    /// 同一个选择器出现多次时合并，后出现的声明覆盖先出现的。
    pub fn parse(css: &str) -> Self {
        let mut rules: HashMap<String, Declarations> = HashMap::new();
        let css = strip_comments(css);

        for block in css.split('}') {
            let Some((selectors, body)) = block.split_once('{') else {
                continue;
            };
            let selectors = selectors.trim();
            if selectors.is_empty() || selectors.starts_with('@') {
                continue;
            }

            let declarations = parse_declarations(body);
            if declarations.is_empty() {
                continue;
            }

            for selector in selectors.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                rules
                    .entry(selector.to_string())
                    .or_default()
                    .extend(declarations.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        Self { rules }
    }

    /// 按选择器完全匹配查找
    pub fn lookup(&self, selector: &str) -> Option<&Declarations> {
        self.rules.get(selector.trim())
    }

    /// 查找类选择器 `.class_name`
    pub fn class(&self, class_name: &str) -> Option<&Declarations> {
        self.lookup(&format!(".{}", class_name))
    }

    /// 选择器数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// 去掉 `/* ... */` 注释，未闭合的注释一直删到文本末尾
pub fn strip_comments(css: &str) -> String {
    let mut result = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        result.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return result,
        }
    }
    result.push_str(rest);
    result
}

/// 解析声明块（也用于元素的 `style` 属性）
///
/// 以 `;` 分隔，每条在第一个 `:` 处拆分，属性名转为小写。
pub fn parse_declarations(body: &str) -> Declarations {
    body.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name, value.to_string()))
            }
        })
        .collect()
}

/// 把CSS长度转换为点数
///
/// `em`/`rem` 按 `root_em_px` 换算；`px`、`pt` 和不带单位的数字直接使用；
/// 其他单位返回None。
pub fn css_length(value: &str, root_em_px: f64) -> Option<f64> {
    let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();

    let (number, scale) = if let Some(prefix) = value.strip_suffix("rem") {
        (prefix, root_em_px)
    } else if let Some(prefix) = value.strip_suffix("em") {
        (prefix, root_em_px)
    } else if let Some(prefix) = value.strip_suffix("px") {
        (prefix, 1.0)
    } else if let Some(prefix) = value.strip_suffix("pt") {
        (prefix, 1.0)
    } else {
        (value.as_str(), 1.0)
    };

    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * scale)
}

/// 解析 `text-align`
pub fn text_align(value: &str) -> Option<Align> {
    match value.trim().to_ascii_lowercase().as_str() {
        "center" => Some(Align::Center),
        "start" | "left" => Some(Align::Leading),
        "end" | "right" => Some(Align::Trailing),
        _ => None,
    }
}

/// 把边距声明（简写与单边）应用到 `edges` 上
///
/// # 参数
/// * `declarations` - 声明表
/// * `property` - `margin` 或 `padding`
/// * `edges` - 要修改的四边值
/// * `root_em_px` - em换算基准
///
/// # 返回值
/// * `bool` - 是否有任何一边被设置
pub fn apply_edges(
    declarations: &Declarations,
    property: &str,
    edges: &mut Edges,
    root_em_px: f64,
) -> bool {
    let mut changed = false;

    if let Some(shorthand) = declarations.get(property) {
        let values: Vec<Option<f64>> = shorthand
            .split_whitespace()
            .map(|v| css_length(v, root_em_px))
            .collect();
        let (top, right, bottom, left) = match values.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => (None, None, None, None),
        };
        for (slot, value) in [
            (&mut edges.top, top),
            (&mut edges.right, right),
            (&mut edges.bottom, bottom),
            (&mut edges.left, left),
        ] {
            if let Some(value) = value {
                *slot = value;
                changed = true;
            }
        }
    }

    for (side, slot) in [
        ("top", &mut edges.top),
        ("right", &mut edges.right),
        ("bottom", &mut edges.bottom),
        ("left", &mut edges.left),
    ] {
        if let Some(value) = declarations
            .get(&format!("{}-{}", property, side))
            .and_then(|v| css_length(v, root_em_px))
        {
            *slot = value;
            changed = true;
        }
    }

    changed
}
