//! quick-xml 的辅助函数
//!
//! container、OPF、NCX 三个解析器共用的属性读取逻辑。

use crate::epub::error::{EpubError, Result};
use quick_xml::events::BytesStart;
use std::collections::HashMap;

/// 收集元素的所有属性（键为去掉命名空间前缀的本地名称）
///
/// 例如 `opf:role="aut"` 会以 `role` 为键保存。
pub(crate) fn attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// 读取单个属性
pub(crate) fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| EpubError::XmlError(quick_xml::Error::InvalidAttr(err)))?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

/// 元素的本地名称
pub(crate) fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}
