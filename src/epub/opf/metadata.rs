//! 元数据处理模块
//!
//! 提供EPUB元数据的结构定义和处理功能。Dublin Core元素按本地名称
//! （去掉 `dc:` 前缀）分派到对应字段，其余 `<meta>` 标签原样保存在
//! `meta_attributes` 中。

use crate::epub::config::MetadataConfig;
use serde::Serialize;
use std::collections::HashMap;

/// 创建者信息(作者、编辑者等)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Author {
    /// 创建者姓名
    pub name: String,
    /// 角色(如aut、edt等)
    pub role: Option<String>,
    /// 排序用名称
    pub file_as: Option<String>,
    /// 元素ID（用于关联refines元数据）
    pub id: Option<String>,
}

/// 标识符信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Identifier {
    /// 元素ID
    pub id: Option<String>,
    /// 标识符类型(如ISBN、UUID等)
    pub scheme: Option<String>,
    /// 标识符值
    pub value: String,
}

/// 带事件类型的日期
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventDate {
    pub date: String,
    /// 事件(如publication、modification)
    pub event: Option<String>,
}

/// 非Dublin Core的meta标签
///
/// EPUB2写法 `<meta name="cover" content="img"/>` 填充 `name`/`content`，
/// EPUB3写法 `<meta property="..." refines="#id">值</meta>` 填充 `property`/`value`/`refines`。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meta {
    pub name: Option<String>,
    pub content: Option<String>,
    pub id: Option<String>,
    pub property: Option<String>,
    pub value: Option<String>,
    pub refines: Option<String>,
}

/// OPF文件中的元数据信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub titles: Vec<String>,
    /// `dc:creator` 与 `dc:contributor` 都保存在这里
    pub creators: Vec<Author>,
    pub identifiers: Vec<Identifier>,
    pub dates: Vec<EventDate>,
    pub language: String,
    pub subjects: Vec<String>,
    pub descriptions: Vec<String>,
    pub publishers: Vec<String>,
    pub rights: Vec<String>,
    pub sources: Vec<String>,
    pub format: Option<String>,
    pub meta_attributes: Vec<Meta>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(&MetadataConfig::default())
    }
}

impl Metadata {
    /// 创建新的元数据实例，语言使用配置中的默认值
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            titles: Vec::new(),
            creators: Vec::new(),
            identifiers: Vec::new(),
            dates: Vec::new(),
            language: config.default_language.clone(),
            subjects: Vec::new(),
            descriptions: Vec::new(),
            publishers: Vec::new(),
            rights: Vec::new(),
            sources: Vec::new(),
            format: None,
            meta_attributes: Vec::new(),
        }
    }

    /// 添加一个Dublin Core元素
    ///
    /// # 参数
    /// * `element_name` - 去掉命名空间前缀的元素名（如 `title`、`creator`）
    /// * `value` - 元素文本
    /// * `attributes` - 元素属性（键同样去掉了前缀，如 `role`、`file-as`）
    /// * `config` - 元数据规则
    pub fn add_element(
        &mut self,
        element_name: &str,
        value: &str,
        attributes: &HashMap<String, String>,
        config: &MetadataConfig,
    ) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let attr = |key: &str| attributes.get(key).filter(|v| !v.is_empty()).cloned();

        match element_name {
            "title" => self.titles.push(value.to_string()),
            "creator" | "contributor" => self.creators.push(Author {
                name: value.to_string(),
                role: attr("role"),
                file_as: attr("file-as"),
                id: attr("id"),
            }),
            "identifier" => self.identifiers.push(Identifier {
                id: attr("id"),
                scheme: attr("scheme"),
                value: value.to_string(),
            }),
            "date" => self.dates.push(EventDate {
                date: value.to_string(),
                event: attr("event"),
            }),
            "language" => self.set_language(value, config),
            "subject" => self.subjects.push(value.to_string()),
            "description" => self.descriptions.push(value.to_string()),
            "publisher" => self.publishers.push(value.to_string()),
            "rights" => self.rights.push(value.to_string()),
            "source" => self.sources.push(value.to_string()),
            "format" => self.format = Some(value.to_string()),
            other => tracing::debug!("忽略元数据元素: {}", other),
        }
    }

    /// 添加一个meta标签
    pub fn add_meta(&mut self, attributes: &HashMap<String, String>, value: &str) {
        let attr = |key: &str| attributes.get(key).cloned();
        let value = value.trim();
        self.meta_attributes.push(Meta {
            name: attr("name"),
            content: attr("content"),
            id: attr("id"),
            property: attr("property"),
            value: if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            },
            refines: attr("refines"),
        });
    }

    fn set_language(&mut self, language: &str, config: &MetadataConfig) {
        if config.legacy_language_fallback && language == "en" {
            return;
        }
        self.language = language.to_string();
    }

    /// 把EPUB3的refines元数据应用到对应的创建者上
    ///
    /// 只处理 `role` 与 `file-as` 两种属性，且不会覆盖元素本身已经带有的值。
    pub fn apply_refinements(&mut self) {
        for meta in &self.meta_attributes {
            let (Some(refines), Some(property), Some(value)) =
                (&meta.refines, &meta.property, &meta.value)
            else {
                continue;
            };
            let target_id = refines.trim_start_matches('#');

            for creator in self
                .creators
                .iter_mut()
                .filter(|c| c.id.as_deref() == Some(target_id))
            {
                match property.as_str() {
                    "role" if creator.role.is_none() => creator.role = Some(value.clone()),
                    "file-as" if creator.file_as.is_none() => creator.file_as = Some(value.clone()),
                    _ => {}
                }
            }
        }
    }

    /// 获取主标题
    pub fn title(&self) -> Option<&str> {
        self.titles.first().map(String::as_str)
    }

    /// 第一个创建者的姓名
    pub fn primary_author(&self) -> Option<&str> {
        self.creators.first().map(|c| c.name.as_str())
    }

    /// 查找name属性匹配的meta标签
    pub fn find_meta_by_name(&self, name: &str) -> Option<&Meta> {
        self.meta_attributes
            .iter()
            .find(|m| m.name.as_deref() == Some(name))
    }

    /// 查找property属性匹配且不是refines的meta标签
    pub fn find_meta_by_property(&self, property: &str) -> Option<&Meta> {
        self.meta_attributes
            .iter()
            .find(|m| m.property.as_deref() == Some(property) && m.refines.is_none())
    }

    /// `<meta name="cover">` 指向的清单ID
    pub fn cover_id(&self) -> Option<&str> {
        self.find_meta_by_name("cover")
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// 最后修改时间（`dcterms:modified`）
    pub fn modified(&self) -> Option<&str> {
        self.find_meta_by_property("dcterms:modified")
            .and_then(|m| m.value.as_deref())
    }
}
