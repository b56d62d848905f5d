//! 解析器配置模块
//!
//! 提供解析器行为的配置管理功能，支持从YAML文件加载配置。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_PATH: &str = "epubforge.yaml";

/// 样式默认值配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// 1em 对应的像素值
    pub root_em_px: f64,
    /// 正文（段落、span、div）的根字号
    pub body_font_size: f64,
    /// h1 默认字号
    pub h1_font_size: f64,
    /// h2 默认字号
    pub h2_font_size: f64,
    /// h3 默认字号
    pub h3_font_size: f64,
    /// h4 默认字号
    pub h4_font_size: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            root_em_px: 16.0,
            body_font_size: 16.0,
            h1_font_size: 26.0,
            h2_font_size: 22.0,
            h3_font_size: 18.0,
            h4_font_size: 14.0,
        }
    }
}

impl StyleConfig {
    /// 获取指定标题级别的默认字号
    pub fn heading_font_size(&self, level: u8) -> f64 {
        match level {
            1 => self.h1_font_size,
            2 => self.h2_font_size,
            3 => self.h3_font_size,
            _ => self.h4_font_size,
        }
    }
}

/// 元数据配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// 没有声明语言时使用的默认语言
    pub default_language: String,
    /// 旧规则：声明为 "en" 时仍保留默认语言
    pub legacy_language_fallback: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            default_language: "en-US".to_string(),
            legacy_language_fallback: false,
        }
    }
}

/// 压缩包解压配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// 解压根目录，每本书解压到 `<根目录>/<文件名>`
    pub extraction_root: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            extraction_root: std::env::temp_dir().join("epubforge"),
        }
    }
}

/// 解析器配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpubConfig {
    /// 样式默认值
    pub style: StyleConfig,
    /// 元数据规则
    pub metadata: MetadataConfig,
    /// 解压设置
    pub archive: ArchiveConfig,
}

impl EpubConfig {
    /// 从YAML文本解析配置
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yml::from_str(content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }

    /// 从指定的配置文件中加载配置
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use epubforge::EpubConfig;
    /// let config = EpubConfig::from_file("epubforge.yaml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;
        Self::from_yaml_str(&content)
    }

    /// 序列化为YAML文本
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yml::to_string(self)
            .map_err(|e| EpubError::ConfigError(format!("序列化配置失败: {}", e)))
    }

    /// 生成默认配置文件到指定路径
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = Self::default().to_yaml_string()?;

        let content_with_header = format!(
            "# epubforge 配置文件\n# style: 样式默认值, metadata: 元数据规则, archive: 解压设置\n\n{}",
            yaml_content
        );

        fs::write(path.as_ref(), content_with_header)
            .map_err(|e| EpubError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 尝试从文件加载，文件不存在或无效时使用默认配置
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("使用默认配置 ({})", e);
                Self::default()
            }
        }
    }
}
