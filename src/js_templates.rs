/// Renders `s` as a JavaScript string literal.
pub fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

pub const READY_STATE: &str = "document.readyState";

/// Looks for the result frame in the top document.
///
/// Resolves to `{found, name, url, ready, locator}`; `ready` is the frame
/// document's `readyState`, or null when it cannot be read yet.
pub fn find_frame(name: &str, url_marker: &str) -> String {
    format!(
        r#"(function(){{const name={};const marker={};for(const f of Array.from(document.querySelectorAll('iframe'))){{const n=f.getAttribute('name')||f.id||'';const src=f.src||'';if((name&&n===name)||(marker&&src.includes(marker))){{let ready=null;try{{ready=f.contentDocument?f.contentDocument.readyState:null}}catch(e){{}}const locator=n?(f.getAttribute('name')?'iframe[name="'+CSS.escape(n)+'"]':'#'+CSS.escape(n)):'iframe[src*="'+CSS.escape(marker)+'"]';return{{found:true,name:n,url:src,ready:ready,locator:locator}}}}}}return{{found:false}}}})()"#,
        js_str(name),
        js_str(url_marker)
    )
}

/// Wraps `body` so it runs against the frame document `d` and window `w`.
///
/// Resolves to `{frame:false}` when the frame is gone, otherwise
/// `{frame:true,value:<body result>}`.
fn in_frame(locator: &str, body: &str) -> String {
    format!(
        r#"(function(){{const f=document.querySelector({});let d=null;try{{d=f?f.contentDocument:null}}catch(e){{}}if(!d)return{{frame:false}};const w=f.contentWindow;return{{frame:true,value:(function(){{{}}})()}}}})()"#,
        js_str(locator),
        body
    )
}

pub fn list_page_controls(locator: &str, selector: &str, inactive_class: &str) -> String {
    in_frame(
        locator,
        &format!(
            r#"const inactive={};return Array.from(d.querySelectorAll({})).map(b=>({{label:(b.textContent||'').trim(),disabled:(inactive!==''&&b.classList.contains(inactive))||b.disabled===true||b.getAttribute('aria-disabled')==='true'}}));"#,
            js_str(inactive_class),
            js_str(selector)
        ),
    )
}

pub fn click_page(locator: &str, selector: &str, page: u32) -> String {
    in_frame(
        locator,
        &format!(
            r#"const target=Array.from(d.querySelectorAll({})).find(b=>{{const t=(b.textContent||'').trim();return /^\d+$/.test(t)&&Number(t)==={}}});if(!target)return false;target.scrollIntoView({{block:'center',behavior:'instant'}});target.click();return true;"#,
            js_str(selector),
            page
        ),
    )
}

/// The state is round-tripped through JSON so only plain data crosses CDP.
pub fn read_state(locator: &str, global: &str) -> String {
    in_frame(
        locator,
        &format!(
            r#"const s=w[{}];if(s===undefined||s===null)return null;return JSON.parse(JSON.stringify(s));"#,
            js_str(global)
        ),
    )
}

pub fn inline_scripts(locator: &str) -> String {
    in_frame(
        locator,
        "return Array.from(d.querySelectorAll('script:not([src])')).map(s=>s.textContent||'');",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes() {
        assert_eq!(js_str("plain"), "\"plain\"");
        assert_eq!(js_str("it's \"q\""), r#""it's \"q\"""#);
        assert_eq!(js_str("a\\b"), r#""a\\b""#);
    }

    #[test]
    fn test_find_frame() {
        let script = find_frame("searchIframe", "pcmap.place.naver.com");
        assert!(script.contains(r#"const name="searchIframe""#));
        assert!(script.contains(r#"const marker="pcmap.place.naver.com""#));
        assert!(script.contains("readyState"));
    }

    #[test]
    fn test_frame_scripts_guard_missing_frame() {
        let script = read_state("iframe[name=\"searchIframe\"]", "__APOLLO_STATE__");
        assert!(script.contains(r#"document.querySelector("iframe[name=\"searchIframe\"]")"#));
        assert!(script.contains("return{frame:false}"));
        assert!(script.contains(r#"w["__APOLLO_STATE__"]"#));
    }

    #[test]
    fn test_list_page_controls() {
        let script = list_page_controls("#f", ".zRM9F .mBN2s", "qxokY");
        assert!(script.contains(r#"d.querySelectorAll(".zRM9F .mBN2s")"#));
        assert!(script.contains(r#"const inactive="qxokY""#));
    }

    #[test]
    fn test_click_page() {
        let script = click_page("#f", ".btn", 3);
        assert!(script.contains(r"/^\d+$/.test(t)&&Number(t)===3"));
        assert!(!script.contains("parseInt"));
        assert!(script.contains("target.click()"));
    }

    #[test]
    fn test_inline_scripts() {
        let script = inline_scripts("#f");
        assert!(script.contains("script:not([src])"));
    }
}
