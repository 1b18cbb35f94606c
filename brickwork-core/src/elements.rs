use serde::{Deserialize, Serialize};

use crate::{
    classify::Label,
    entities::{BBox, PageID},
};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PageNumber {
    pub value: u32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StepNumber {
    pub value: u32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartCount {
    pub count: u32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BagNumber {
    pub value: u32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Part {
    pub count: PartCount,
    pub image_id: Option<String>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartsList {
    pub parts: Vec<Part>,
    pub bbox: BBox,
}

impl PartsList {
    pub fn total_items(&self) -> u32 {
        self.parts.iter().map(|p| p.count.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Diagram {
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubAssembly {
    pub diagrams: Vec<Diagram>,
    pub count: Option<PartCount>,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RotationSymbol {
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Arrow {
    /// Tip of the arrowhead, in page coordinates.
    pub tip: (f64, f64),
    pub bbox: BBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Divider {
    pub orientation: Orientation,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub step_number: StepNumber,
    pub parts_list: Option<PartsList>,
    pub diagram: Option<Diagram>,
    pub sub_assemblies: Vec<SubAssembly>,
    pub arrows: Vec<Arrow>,
    pub rotation_symbol: Option<RotationSymbol>,
    pub bbox: BBox,
}

impl Step {
    /// Recomputes the step bounds from everything it owns.
    pub(crate) fn refresh_bbox(&mut self) {
        let mut bbox = self.step_number.bbox;
        if let Some(parts_list) = &self.parts_list {
            bbox.merge(&parts_list.bbox);
        }
        if let Some(diagram) = &self.diagram {
            bbox.merge(&diagram.bbox);
        }
        for sub_assembly in &self.sub_assemblies {
            bbox.merge(&sub_assembly.bbox);
        }
        for arrow in &self.arrows {
            bbox.merge(&arrow.bbox);
        }
        if let Some(rotation_symbol) = &self.rotation_symbol {
            bbox.merge(&rotation_symbol.bbox);
        }
        self.bbox = bbox;
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page {
    pub page_index: PageID,
    pub page_number: Option<PageNumber>,
    pub steps: Vec<Step>,
    pub new_bags: Vec<BagNumber>,
    pub dividers: Vec<Divider>,
    pub bbox: BBox,
}

/// Output of a successful candidate build. Each variant corresponds to exactly one
/// [`Label`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "element_type")]
pub enum Element {
    PageNumber(PageNumber),
    StepNumber(StepNumber),
    PartCount(PartCount),
    BagNumber(BagNumber),
    Part(Part),
    PartsList(PartsList),
    Diagram(Diagram),
    SubAssembly(SubAssembly),
    RotationSymbol(RotationSymbol),
    Arrow(Arrow),
    Divider(Divider),
    Step(Step),
    Page(Page),
}

impl Element {
    pub fn bbox(&self) -> &BBox {
        match self {
            Element::PageNumber(e) => &e.bbox,
            Element::StepNumber(e) => &e.bbox,
            Element::PartCount(e) => &e.bbox,
            Element::BagNumber(e) => &e.bbox,
            Element::Part(e) => &e.bbox,
            Element::PartsList(e) => &e.bbox,
            Element::Diagram(e) => &e.bbox,
            Element::SubAssembly(e) => &e.bbox,
            Element::RotationSymbol(e) => &e.bbox,
            Element::Arrow(e) => &e.bbox,
            Element::Divider(e) => &e.bbox,
            Element::Step(e) => &e.bbox,
            Element::Page(e) => &e.bbox,
        }
    }

    pub fn label(&self) -> Label {
        match self {
            Element::PageNumber(_) => Label::PageNumber,
            Element::StepNumber(_) => Label::StepNumber,
            Element::PartCount(_) => Label::PartCount,
            Element::BagNumber(_) => Label::BagNumber,
            Element::Part(_) => Label::Part,
            Element::PartsList(_) => Label::PartsList,
            Element::Diagram(_) => Label::Diagram,
            Element::SubAssembly(_) => Label::SubAssembly,
            Element::RotationSymbol(_) => Label::RotationSymbol,
            Element::Arrow(_) => Label::Arrow,
            Element::Divider(_) => Label::Divider,
            Element::Step(_) => Label::Step,
            Element::Page(_) => Label::Page,
        }
    }

    /// Direct children in document order.
    pub fn children(&self) -> Vec<Element> {
        match self {
            Element::Part(part) => vec![Element::PartCount(part.count.clone())],
            Element::PartsList(list) => list.parts.iter().cloned().map(Element::Part).collect(),
            Element::SubAssembly(sub) => sub
                .diagrams
                .iter()
                .cloned()
                .map(Element::Diagram)
                .chain(sub.count.clone().map(Element::PartCount))
                .collect(),
            Element::Step(step) => {
                let mut children = vec![Element::StepNumber(step.step_number.clone())];
                children.extend(step.parts_list.clone().map(Element::PartsList));
                children.extend(step.diagram.clone().map(Element::Diagram));
                children.extend(step.sub_assemblies.iter().cloned().map(Element::SubAssembly));
                children.extend(step.arrows.iter().cloned().map(Element::Arrow));
                children.extend(step.rotation_symbol.clone().map(Element::RotationSymbol));
                children
            }
            Element::Page(page) => {
                let mut children: Vec<Element> = Vec::new();
                children.extend(page.page_number.clone().map(Element::PageNumber));
                children.extend(page.new_bags.iter().cloned().map(Element::BagNumber));
                children.extend(page.dividers.iter().cloned().map(Element::Divider));
                children.extend(page.steps.iter().cloned().map(Element::Step));
                children
            }
            Element::PageNumber(_)
            | Element::StepNumber(_)
            | Element::PartCount(_)
            | Element::BagNumber(_)
            | Element::Diagram(_)
            | Element::RotationSymbol(_)
            | Element::Arrow(_)
            | Element::Divider(_) => Vec::new(),
        }
    }

    /// Pre-order traversal of the whole subtree, starting with `self`.
    pub fn walk<F: FnMut(&Element, usize)>(&self, visit: &mut F) {
        fn walk_inner<F: FnMut(&Element, usize)>(el: &Element, depth: usize, visit: &mut F) {
            visit(el, depth);
            for child in el.children() {
                walk_inner(&child, depth + 1, visit);
            }
        }
        walk_inner(self, 0, visit)
    }
}
