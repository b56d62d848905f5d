//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。解析分两步：
//! 先用quick-xml流式读取各个区段，再在清单上解析封面、目录、脊柱与导引的引用。

use crate::epub::config::MetadataConfig;
use crate::epub::error::{EpubError, ParseWarning, Result};
use crate::epub::media_type::NCX;
use crate::epub::opf::{
    guide::GuideReference,
    manifest::Manifest,
    metadata::Metadata,
    spine::{Spine, SpineReference},
};
use crate::epub::resource::{EpubResource, split_fragment};
use crate::epub::xml;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::path::Path;

/// 版本属性缺失或无法解析时使用的EPUB版本
pub const DEFAULT_VERSION: f64 = 3.0;

/// OPF文件解析结果
#[derive(Debug, Clone)]
pub struct PackageDocument {
    /// EPUB版本
    pub version: f64,
    /// package元素的unique-identifier属性
    pub unique_identifier: Option<String>,
    /// 清单项(文件列表)
    pub manifest: Manifest,
    /// 元数据，OPF中没有 `<metadata>` 时为None
    pub metadata: Option<Metadata>,
    /// 脊柱(阅读顺序)，OPF中没有 `<spine>` 时为None
    pub spine: Option<Spine>,
    /// EPUB2导引
    pub guide: Vec<GuideReference>,
    pub cover_image: Option<EpubResource>,
    pub toc_resource: Option<EpubResource>,
    /// 解析过程中降级处理的记录
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Metadata,
    Manifest,
    Spine,
    Guide,
}

struct ItemRef {
    idref: String,
    linear: bool,
}

struct RawGuideReference {
    reference_type: String,
    title: Option<String>,
    href: String,
}

impl PackageDocument {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    /// * `resource_base` - 资源基础路径（OPF所在目录）
    /// * `package_root` - EPUB解压根目录，清单路径不会解析到它之外
    /// * `config` - 元数据规则
    ///
    /// # 返回值
    /// * `Result<PackageDocument>` - XML格式错误时返回 `OpfParseError`
    pub fn parse(
        xml_content: &str,
        resource_base: &Path,
        package_root: &Path,
        config: &MetadataConfig,
    ) -> Result<PackageDocument> {
        Self::parse_events(xml_content, resource_base, package_root, config).map_err(|e| match e {
            EpubError::XmlError(err) => EpubError::OpfParseError(err.to_string()),
            other => other,
        })
    }

    fn parse_events(
        xml_content: &str,
        resource_base: &Path,
        package_root: &Path,
        config: &MetadataConfig,
    ) -> Result<PackageDocument> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut found_package = false;
        let mut version = None;
        let mut unique_identifier = None;
        let mut manifest = Manifest::new();
        let mut metadata: Option<Metadata> = None;
        let mut has_spine = false;
        let mut spine_toc = None;
        let mut itemrefs = Vec::new();
        let mut raw_guide = Vec::new();

        let mut buf = Vec::new();
        let mut section = Section::None;
        let mut depth = 0usize;
        let mut text_content = String::new();
        let mut current_attributes = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    depth += 1;
                    let local_name = xml::local_name(e);

                    match (section, local_name.as_str()) {
                        (_, "package") => {
                            found_package = true;
                            let attrs = xml::attributes(e)?;
                            version = attrs.get("version").cloned();
                            unique_identifier = attrs.get("unique-identifier").cloned();
                        }
                        (_, "metadata") => {
                            section = Section::Metadata;
                            metadata.get_or_insert_with(|| Metadata::new(config));
                        }
                        (_, "manifest") => section = Section::Manifest,
                        (_, "spine") => {
                            section = Section::Spine;
                            has_spine = true;
                            spine_toc = xml::attribute(e, b"toc")?;
                        }
                        (_, "guide") => section = Section::Guide,
                        (Section::Manifest, "item") => {
                            Self::parse_manifest_item(e, resource_base, package_root, &mut manifest)?;
                        }
                        (Section::Spine, "itemref") => {
                            Self::parse_itemref(e, &mut itemrefs)?;
                        }
                        (Section::Guide, "reference") => {
                            Self::parse_guide_reference(e, &mut raw_guide)?;
                        }
                        (Section::Metadata, _) => {
                            current_attributes = xml::attributes(e)?;
                            text_content.clear();
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    depth = depth.saturating_sub(1);
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

                    match (section, local_name.as_str()) {
                        (_, "metadata" | "manifest" | "spine" | "guide") => {
                            section = Section::None;
                        }
                        (Section::Metadata, "meta") => {
                            if let Some(metadata) = metadata.as_mut() {
                                metadata.add_meta(&current_attributes, &text_content);
                            }
                        }
                        (Section::Metadata, name) => {
                            if let Some(metadata) = metadata.as_mut() {
                                metadata.add_element(name, &text_content, &current_attributes, config);
                            }
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::Text(e) if section == Section::Metadata => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::CData(e) if section == Section::Metadata => {
                    text_content.push_str(&String::from_utf8_lossy(&e));
                }
                Event::Eof => {
                    if depth != 0 {
                        return Err(EpubError::OpfParseError(format!(
                            "文档提前结束，还有 {} 个元素未闭合",
                            depth
                        )));
                    }
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        if !found_package {
            return Err(EpubError::OpfParseError("缺少package元素".to_string()));
        }

        let version = version
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(DEFAULT_VERSION);

        if let Some(metadata) = metadata.as_mut() {
            metadata.apply_refinements();
        }

        let mut warnings = Vec::new();
        let spine = if has_spine {
            Some(Self::build_spine(spine_toc, itemrefs, &manifest, &mut warnings))
        } else {
            None
        };

        let cover_image = Self::resolve_cover(&manifest, metadata.as_ref()).cloned();
        if cover_image.is_none() {
            tracing::warn!("未找到封面图片");
            warnings.push(ParseWarning::CoverNotFound);
        }

        let toc_resource = Self::resolve_toc_resource(
            &manifest,
            spine.as_ref().and_then(|s| s.toc.as_deref()),
        )
        .cloned();

        let guide = raw_guide
            .into_iter()
            .map(|raw| {
                let (_, fragment_id) = split_fragment(&raw.href);
                GuideReference {
                    resource: manifest.find_by_href(&raw.href).cloned(),
                    reference_type: raw.reference_type,
                    title: raw.title,
                    href: raw.href,
                    fragment_id,
                }
            })
            .collect();

        tracing::debug!(
            "OPF解析完成: 版本 {}, 清单 {} 项, 脊柱 {} 项",
            version,
            manifest.len(),
            spine.as_ref().map(Spine::len).unwrap_or(0)
        );

        Ok(PackageDocument {
            version,
            unique_identifier,
            manifest,
            metadata,
            spine,
            guide,
            cover_image,
            toc_resource,
            warnings,
        })
    }

    /// 解析清单项
    fn parse_manifest_item(
        e: &BytesStart,
        resource_base: &Path,
        package_root: &Path,
        manifest: &mut Manifest,
    ) -> Result<()> {
        let attrs = xml::attributes(e)?;
        let id = attrs.get("id").cloned().unwrap_or_default();
        let href = attrs.get("href").cloned().unwrap_or_default();

        if id.is_empty() || href.is_empty() {
            tracing::debug!("忽略缺少id或href的清单项");
            return Ok(());
        }

        let media_type = attrs.get("media-type").map(String::as_str).unwrap_or("");
        let properties = attrs.get("properties").cloned();
        manifest.push(EpubResource::in_package(
            id,
            href,
            media_type,
            properties,
            resource_base,
            package_root,
        ));

        Ok(())
    }

    /// 解析脊柱项
    fn parse_itemref(e: &BytesStart, itemrefs: &mut Vec<ItemRef>) -> Result<()> {
        let idref = xml::attribute(e, b"idref")?.unwrap_or_default();
        let linear = xml::attribute(e, b"linear")?
            .map(|v| v.trim() != "no")
            .unwrap_or(true);

        if !idref.is_empty() {
            itemrefs.push(ItemRef { idref, linear });
        }

        Ok(())
    }

    fn parse_guide_reference(e: &BytesStart, raw_guide: &mut Vec<RawGuideReference>) -> Result<()> {
        let attrs = xml::attributes(e)?;
        let Some(href) = attrs.get("href").filter(|h| !h.is_empty()) else {
            return Ok(());
        };
        raw_guide.push(RawGuideReference {
            reference_type: attrs.get("type").cloned().unwrap_or_default(),
            title: attrs.get("title").cloned(),
            href: href.clone(),
        });
        Ok(())
    }

    /// 把idref转换为脊柱项，清单中不存在的idref被丢弃并记录警告
    fn build_spine(
        toc: Option<String>,
        itemrefs: Vec<ItemRef>,
        manifest: &Manifest,
        warnings: &mut Vec<ParseWarning>,
    ) -> Spine {
        let mut spine_references = Vec::with_capacity(itemrefs.len());

        for itemref in itemrefs {
            match manifest.find_by_id(&itemref.idref) {
                Some(resource) => {
                    spine_references.push(SpineReference::with_linear(resource.clone(), itemref.linear));
                }
                None => {
                    tracing::warn!("spine引用了不存在的清单项: {}", itemref.idref);
                    warnings.push(ParseWarning::UnresolvedSpineItem {
                        idref: itemref.idref,
                    });
                }
            }
        }

        Spine {
            toc,
            spine_references,
        }
    }

    /// 查找封面图片
    ///
    /// 依次检查：`<meta name="cover">` 指向的ID；ID包含 "cover" 的图片；
    /// properties包含 "cover-image" 的资源。
    pub fn resolve_cover<'a>(
        manifest: &'a Manifest,
        metadata: Option<&Metadata>,
    ) -> Option<&'a EpubResource> {
        metadata
            .and_then(Metadata::cover_id)
            .and_then(|id| manifest.find_by_id(id))
            .or_else(|| manifest.find_id_containing("cover", |r| r.media_type.is_image()))
            .or_else(|| manifest.find_by_property("cover-image"))
    }

    /// 查找目录资源
    ///
    /// 依次检查：spine的toc属性指向的NCX；NCX媒体类型；默认扩展名为ncx；
    /// properties包含 "nav" 的导航文档。
    pub fn resolve_toc_resource<'a>(
        manifest: &'a Manifest,
        spine_toc: Option<&str>,
    ) -> Option<&'a EpubResource> {
        spine_toc
            .and_then(|id| manifest.find_by_id(id))
            .filter(|r| r.media_type == *NCX)
            .or_else(|| manifest.find_by_media_type(&NCX))
            .or_else(|| manifest.find_by_extension("ncx"))
            .or_else(|| manifest.find_by_property("nav"))
    }

    /// 样式表：第一个ID包含 "style" 的清单项
    pub fn stylesheet(&self) -> Option<&EpubResource> {
        self.manifest.find_id_containing("style", |_| true)
    }
}
