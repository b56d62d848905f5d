//! NCX解析器模块
//!
//! 提供NCX（Navigation Control file for XML）文件的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::toc::navigation::{DocTitle, NavContent, NavLabel, NavMap, NavPoint, NcxMetadata};
use crate::epub::xml;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// NCX文件解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct Ncx {
    /// NCX版本
    pub version: String,
    /// 元数据
    pub metadata: NcxMetadata,
    /// 文档标题
    pub doc_title: Option<DocTitle>,
    /// 导航地图
    pub nav_map: NavMap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Head,
    DocTitle,
    NavMap,
}

impl Ncx {
    /// 解析NCX文件内容
    ///
    /// 导航点保持文档中的顺序，`playOrder` 只作为字段保存。
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Ncx>` - XML格式错误时返回 `NcxParseError`
    pub fn parse_xml(xml_content: &str) -> Result<Ncx> {
        Self::parse_events(xml_content).map_err(|e| match e {
            EpubError::XmlError(err) => EpubError::NcxParseError(err.to_string()),
            other => other,
        })
    }

    fn parse_events(xml_content: &str) -> Result<Ncx> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut version = String::new();
        let mut metadata = NcxMetadata::default();
        let mut doc_title = None;
        let mut nav_map = NavMap::default();
        let mut found_nav_map = false;

        let mut buf = Vec::new();
        let mut section = Section::None;
        let mut depth = 0usize;
        let mut text_content = String::new();

        // 导航点解析状态
        let mut nav_point_stack: Vec<NavPoint> = Vec::new();
        let mut current_nav_point: Option<NavPoint> = None;
        let mut current_nav_label: Option<NavLabel> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    depth += 1;
                    let local_name = xml::local_name(e);

                    match local_name.as_str() {
                        "ncx" => {
                            version = xml::attribute(e, b"version")?.unwrap_or_default();
                        }
                        "head" => section = Section::Head,
                        "docTitle" => section = Section::DocTitle,
                        "navMap" => {
                            section = Section::NavMap;
                            found_nav_map = true;
                        }
                        "meta" if section == Section::Head => {
                            Self::parse_meta_element(e, &mut metadata)?;
                        }
                        "navPoint" if section == Section::NavMap => {
                            let id = xml::attribute(e, b"id")?.unwrap_or_default();
                            let play_order = xml::attribute(e, b"playOrder")?
                                .and_then(|v| v.trim().parse().ok());

                            // 如果当前有未完成的导航点，将其推入栈中
                            if let Some(nav_point) = current_nav_point.take() {
                                nav_point_stack.push(nav_point);
                            }
                            current_nav_point = Some(NavPoint::new(id, play_order));
                        }
                        "navLabel" if section == Section::NavMap => {
                            current_nav_label = Some(NavLabel::default());
                        }
                        "content" if section == Section::NavMap => {
                            let src = xml::attribute(e, b"src")?.unwrap_or_default();
                            if let Some(nav_point) = current_nav_point.as_mut() {
                                nav_point.content = NavContent::new(src);
                            }
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::End(ref e) => {
                    depth = depth.saturating_sub(1);
                    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

                    match local_name.as_str() {
                        "head" | "navMap" => section = Section::None,
                        "docTitle" => {
                            let text = text_content.trim().to_string();
                            if !text.is_empty() {
                                doc_title = Some(DocTitle::new(text));
                            }
                            section = Section::None;
                        }
                        "text" if section == Section::NavMap => {
                            if let Some(nav_label) = current_nav_label.as_mut() {
                                nav_label.text = text_content.trim().to_string();
                            }
                        }
                        "navLabel" if section == Section::NavMap => {
                            // 只使用第一个navLabel
                            if let (Some(nav_label), Some(nav_point)) =
                                (current_nav_label.take(), current_nav_point.as_mut())
                            {
                                if nav_point.nav_label.text.is_empty() {
                                    nav_point.nav_label = nav_label;
                                }
                            }
                        }
                        "navPoint" if section == Section::NavMap => {
                            if let Some(nav_point) = current_nav_point.take() {
                                if let Some(mut parent) = nav_point_stack.pop() {
                                    parent.add_child(nav_point);
                                    current_nav_point = Some(parent);
                                } else {
                                    nav_map.add_nav_point(nav_point);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::CData(e) => {
                    text_content.push_str(&String::from_utf8_lossy(&e));
                }
                Event::Eof => {
                    if depth != 0 {
                        return Err(EpubError::NcxParseError(format!(
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

        if !found_nav_map {
            return Err(EpubError::NcxParseError("没有找到navMap元素".to_string()));
        }

        Ok(Ncx {
            version,
            metadata,
            doc_title,
            nav_map,
        })
    }

    /// 解析head中的meta元素
    fn parse_meta_element(e: &BytesStart, metadata: &mut NcxMetadata) -> Result<()> {
        let name = xml::attribute(e, b"name")?.unwrap_or_default();
        let content = xml::attribute(e, b"content")?.unwrap_or_default();

        match name.as_str() {
            "dtb:uid" => metadata.uid = Some(content),
            "dtb:depth" => metadata.depth = content.trim().parse().ok(),
            "" => {}
            _ => {
                metadata.other_metadata.insert(name, content);
            }
        }

        Ok(())
    }

    /// 获取文档标题文本
    pub fn get_title(&self) -> Option<&str> {
        self.doc_title.as_ref().map(|title| title.text.as_str())
    }

    /// 获取导航深度，优先使用head中声明的值
    pub fn get_depth(&self) -> u32 {
        self.metadata.depth.unwrap_or_else(|| self.nav_map.get_depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:uuid:1234"/>
    <meta name="dtb:depth" content="2"/>
    <meta name="dtb:generator" content="test"/>
  </head>
  <docTitle><text>Sample Book</text></docTitle>
  <navMap>
    <navPoint id="np1" playOrder="3">
      <navLabel><text>Part One</text></navLabel>
      <content src="Text/part1.xhtml"/>
      <navPoint id="np1-1" playOrder="4">
        <navLabel><text>Chapter 1</text></navLabel>
        <content src="Text/ch1.xhtml#start"/>
      </navPoint>
    </navPoint>
    <navPoint id="np2" playOrder="1">
      <navLabel><text>Part Two</text></navLabel>
      <content src="Text/part2.xhtml"/>
      <navPoint id="np2-1" playOrder="2">
        <navLabel><text>Chapter 2</text></navLabel>
        <content src="Text/ch2.xhtml"/>
      </navPoint>
    </navPoint>
    <navPoint id="np3">
      <navLabel><text>Appendix</text></navLabel>
      <content src="Text/appendix.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

    #[test]
    fn test_parse_ncx_keeps_document_order() {
        let ncx = Ncx::parse_xml(NCX).expect("解析NCX失败");

        assert_eq!(ncx.version, "2005-1");
        assert_eq!(ncx.get_title(), Some("Sample Book"));
        assert_eq!(ncx.metadata.uid.as_deref(), Some("urn:uuid:1234"));
        assert_eq!(ncx.get_depth(), 2);
        assert_eq!(ncx.metadata.other_metadata.get("dtb:generator"), Some(&"test".to_string()));

        let roots = &ncx.nav_map.nav_points;
        let titles: Vec<&str> = roots.iter().map(|p| p.nav_label.text.as_str()).collect();
        assert_eq!(titles, vec!["Part One", "Part Two", "Appendix"]);

        let children: Vec<usize> = roots.iter().map(|p| p.children.len()).collect();
        assert_eq!(children, vec![1, 1, 0]);

        assert_eq!(roots[0].play_order, Some(3));
        assert_eq!(roots[2].play_order, None);
        assert_eq!(roots[0].children[0].content.src, "Text/ch1.xhtml#start");
        assert_eq!(ncx.nav_map.get_depth(), 2);
    }

    #[test]
    fn test_ncx_without_nav_map_is_error() {
        let result = Ncx::parse_xml(r#"<ncx><head/></ncx>"#);
        assert!(matches!(result, Err(EpubError::NcxParseError(_))));
    }

    #[test]
    fn test_truncated_ncx_is_error() {
        let result = Ncx::parse_xml(r#"<ncx><navMap><navPoint id="a">"#);
        assert!(matches!(result, Err(EpubError::NcxParseError(_))));
    }
}
