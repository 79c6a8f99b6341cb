/// Result panel
/// Shows an identification with its description rendered as styled runs
use iced::font::{Style as FontStyle, Weight};
use iced::widget::text::Span;
use iced::widget::{column, container, rich_text, span, text};
use iced::{Color, Element, Font, Length};

use crate::markup::{self, Style};
use crate::state::data::IdentificationResult;
use crate::Message;

/// What the panel displays for one result
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub common_name: String,
    pub scientific_name: String,
    /// Description text runs, each with its font
    pub runs: Vec<(String, Font)>,
    pub failed: bool,
}

impl ResultCard {
    pub fn new(result: &IdentificationResult) -> Self {
        let runs = markup::tokenize(&result.description)
            .into_iter()
            .map(|segment| (segment.text, font_for(segment.style)))
            .collect();

        Self {
            common_name: result.common_name.clone(),
            scientific_name: result.scientific_name.clone(),
            runs,
            failed: result.is_failure(),
        }
    }

    pub fn view<'a>(self) -> Element<'a, Message> {
        let spans: Vec<Span<'a, Message>> = self
            .runs
            .into_iter()
            .map(|(run, font)| span(run).font(font))
            .collect();

        let heading = text(self.common_name).size(28);
        let heading = if self.failed {
            heading.color(Color::from_rgb(0.9, 0.4, 0.4))
        } else {
            heading
        };

        let panel = column![
            heading,
            text(self.scientific_name)
                .size(18)
                .font(font_for(Style { bold: false, italic: true })),
            rich_text(spans).size(16),
        ]
        .spacing(8)
        .padding(16);

        container(panel)
            .width(Length::Fixed(360.0))
            .style(container::rounded_box)
            .into()
    }
}

/// Font for a markup style
pub fn font_for(style: Style) -> Font {
    Font {
        weight: if style.bold { Weight::Bold } else { Weight::Normal },
        style: if style.italic { FontStyle::Italic } else { FontStyle::Normal },
        ..Font::DEFAULT
    }
}
