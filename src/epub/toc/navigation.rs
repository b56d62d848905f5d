//! NCX导航元素数据结构定义
//!
//! 定义NCX文件中的各种导航元素，包括导航点、导航标签、内容引用等。

use std::collections::HashMap;

/// NCX元数据信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NcxMetadata {
    /// 唯一标识符（dtb:uid）
    pub uid: Option<String>,
    /// 导航深度（dtb:depth）
    pub depth: Option<u32>,
    /// 其他元数据
    pub other_metadata: HashMap<String, String>,
}

/// 文档标题
#[derive(Debug, Clone, PartialEq)]
pub struct DocTitle {
    /// 标题文本
    pub text: String,
}

impl DocTitle {
    /// 创建新的文档标题
    pub fn new(text: String) -> Self {
        Self { text }
    }
}

/// 导航标签
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavLabel {
    /// 标签文本
    pub text: String,
}

/// 导航内容引用
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavContent {
    /// 源文件路径
    pub src: String,
}

impl NavContent {
    /// 创建新的导航内容引用
    pub fn new(src: String) -> Self {
        Self { src }
    }
}

/// 导航点
#[derive(Debug, Clone, PartialEq)]
pub struct NavPoint {
    /// 唯一标识符
    pub id: String,
    /// 播放顺序（只保存，不用于排序）
    pub play_order: Option<u32>,
    /// 导航标签
    pub nav_label: NavLabel,
    /// 内容引用
    pub content: NavContent,
    /// 子导航点
    pub children: Vec<NavPoint>,
}

impl NavPoint {
    /// 创建新的导航点
    pub fn new(id: String, play_order: Option<u32>) -> Self {
        Self {
            id,
            play_order,
            nav_label: NavLabel::default(),
            content: NavContent::default(),
            children: Vec::new(),
        }
    }

    /// 添加子导航点
    pub fn add_child(&mut self, child: NavPoint) {
        self.children.push(child);
    }

    /// 获取导航深度
    pub fn get_depth(&self) -> u32 {
        1 + self
            .children
            .iter()
            .map(NavPoint::get_depth)
            .max()
            .unwrap_or(0)
    }
}

/// 导航地图
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavMap {
    /// 导航点列表，保持文档顺序
    pub nav_points: Vec<NavPoint>,
}

impl NavMap {
    /// 添加导航点
    pub fn add_nav_point(&mut self, nav_point: NavPoint) {
        self.nav_points.push(nav_point);
    }

    /// 获取导航深度
    pub fn get_depth(&self) -> u32 {
        self.nav_points
            .iter()
            .map(NavPoint::get_depth)
            .max()
            .unwrap_or(0)
    }
}
