//! 媒体类型模块
//!
//! EPUB清单中会出现的媒体类型表。表之外的类型根据文件扩展名构造。

use once_cell::sync::Lazy;
use serde::Serialize;
use std::path::Path;

/// 媒体类型
///
/// 相等性只比较 `name`（MIME字符串）。
#[derive(Debug, Clone, Eq, Serialize)]
pub struct MediaType {
    /// MIME字符串
    pub name: String,
    /// 默认扩展名（不含点）
    pub default_extension: String,
    /// 所有可能的扩展名
    pub extensions: Vec<String>,
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::hash::Hash for MediaType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

fn media_type(name: &str, default_extension: &str, extensions: &[&str]) -> MediaType {
    let mut all: Vec<String> = vec![default_extension.to_string()];
    all.extend(
        extensions
            .iter()
            .filter(|ext| **ext != default_extension)
            .map(|ext| ext.to_string()),
    );
    MediaType {
        name: name.to_string(),
        default_extension: default_extension.to_string(),
        extensions: all,
    }
}

pub static XHTML: Lazy<MediaType> =
    Lazy::new(|| media_type("application/xhtml+xml", "xhtml", &["htm", "html", "xhtml", "xml"]));
pub static EPUB: Lazy<MediaType> = Lazy::new(|| media_type("application/epub+zip", "epub", &[]));
pub static NCX: Lazy<MediaType> = Lazy::new(|| media_type("application/x-dtbncx+xml", "ncx", &[]));
pub static OPF: Lazy<MediaType> =
    Lazy::new(|| media_type("application/oebps-package+xml", "opf", &[]));
pub static JAVASCRIPT: Lazy<MediaType> = Lazy::new(|| media_type("text/javascript", "js", &[]));
pub static CSS: Lazy<MediaType> = Lazy::new(|| media_type("text/css", "css", &[]));

pub static JPG: Lazy<MediaType> = Lazy::new(|| media_type("image/jpeg", "jpg", &["jpg", "jpeg"]));
pub static PNG: Lazy<MediaType> = Lazy::new(|| media_type("image/png", "png", &[]));
pub static GIF: Lazy<MediaType> = Lazy::new(|| media_type("image/gif", "gif", &[]));
pub static SVG: Lazy<MediaType> = Lazy::new(|| media_type("image/svg+xml", "svg", &[]));

pub static TTF: Lazy<MediaType> = Lazy::new(|| media_type("application/x-font-ttf", "ttf", &[]));
pub static OPEN_TYPE: Lazy<MediaType> =
    Lazy::new(|| media_type("application/vnd.ms-opentype", "otf", &[]));
pub static WOFF: Lazy<MediaType> = Lazy::new(|| media_type("application/font-woff", "woff", &[]));

pub static MP3: Lazy<MediaType> = Lazy::new(|| media_type("audio/mpeg", "mp3", &[]));
pub static MP4: Lazy<MediaType> = Lazy::new(|| media_type("audio/mp4", "mp4", &[]));
pub static OGG: Lazy<MediaType> = Lazy::new(|| media_type("audio/ogg", "ogg", &[]));

pub static SMIL: Lazy<MediaType> = Lazy::new(|| media_type("application/smil+xml", "smil", &[]));
pub static XPGT: Lazy<MediaType> =
    Lazy::new(|| media_type("application/adobe-page-template+xml", "xpgt", &[]));
pub static PLS: Lazy<MediaType> = Lazy::new(|| media_type("application/pls+xml", "pls", &[]));

/// 所有已知媒体类型
pub static MEDIA_TYPES: Lazy<Vec<&'static MediaType>> = Lazy::new(|| {
    vec![
        &*XHTML, &*EPUB, &*NCX, &*OPF, &*JAVASCRIPT, &*CSS, &*JPG, &*PNG, &*GIF, &*SVG,
        &*TTF, &*OPEN_TYPE, &*WOFF, &*MP3, &*MP4, &*OGG, &*SMIL, &*XPGT, &*PLS,
    ]
});

/// 位图图片类型
pub static BITMAP_IMAGES: Lazy<Vec<&'static MediaType>> =
    Lazy::new(|| vec![&*JPG, &*PNG, &*GIF]);

impl MediaType {
    /// 根据MIME名称和文件名确定媒体类型
    ///
    /// 1. MIME名称与表中某项完全相同时直接返回该项
    /// 2. 名称为空时按扩展名在表中查找
    /// 3. 否则保留声明的名称，以文件扩展名作为默认扩展名
    pub fn by(name: &str, file_name: Option<&str>) -> MediaType {
        if let Some(known) = MEDIA_TYPES.iter().find(|mt| mt.name == name) {
            return (*known).clone();
        }

        let extension = file_name.and_then(extension_of).unwrap_or_default();

        if name.trim().is_empty() {
            if let Some(known) = Self::by_extension(&extension) {
                return known;
            }
        }

        MediaType {
            name: name.to_string(),
            default_extension: extension.clone(),
            extensions: if extension.is_empty() { Vec::new() } else { vec![extension] },
        }
    }

    /// 按扩展名在表中查找（不区分大小写）
    pub fn by_extension(extension: &str) -> Option<MediaType> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        MEDIA_TYPES
            .iter()
            .find(|mt| mt.extensions.iter().any(|ext| *ext == extension))
            .map(|mt| (*mt).clone())
    }

    /// 是否为图片类型
    pub fn is_image(&self) -> bool {
        self.name.starts_with("image/")
    }

    /// 是否为位图
    pub fn is_bitmap(&self) -> bool {
        BITMAP_IMAGES.iter().any(|mt| *mt == self)
    }

    /// 是否为(X)HTML文档
    pub fn is_html(&self) -> bool {
        self.name.contains("html")
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
