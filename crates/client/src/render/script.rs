/// Text extraction routine evaluated in the page after it settles.
///
/// Sections, in order: red annotation text (product notes), short Axure
/// shape labels when the page looks like a flowchart, then the full visible
/// text. Returns a placeholder when nothing could be extracted.
pub const TEXT_EXTRACTION_SCRIPT: &str = r#"(() => {
    const sections = [];

    const redTexts = Array.from(document.querySelectorAll('*')).filter(el => {
        const color = window.getComputedStyle(el).color;
        return color && (
            color.includes('rgb(255, 0, 0)') ||
            color.includes('rgb(255,0,0)') ||
            color === 'red'
        );
    });
    if (redTexts.length > 0) {
        const notes = redTexts
            .map(el => el.textContent.trim())
            .filter(t => t.length > 0 && t.length < 200)
            .filter((v, i, a) => a.indexOf(v) === i);
        if (notes.length > 0) {
            sections.push("[Important Tips/Warnings]\n" + notes.join("\n"));
        }
    }

    const shapeTexts = [];
    document.querySelectorAll('[id^="u"], .ax_shape, .shape, [class*="shape"]').forEach(el => {
        const text = el.textContent.trim();
        if (text && text.length < 100) {
            shapeTexts.push(text);
        }
    });
    if (shapeTexts.length > 5) {
        const unique = [...new Set(shapeTexts)];
        sections.push("[Flowchart/Component Text]\n" + unique.slice(0, 20).join(" | "));
    }

    const bodyText = document.body ? (document.body.innerText || '') : '';
    if (bodyText.trim()) {
        sections.push("[Full Page Text]\n" + bodyText.trim());
    }

    if (sections.length === 0) {
        return "Page text is empty or cannot be extracted (refer to the screenshot)";
    }
    return sections.join("\n\n");
})()"#;
