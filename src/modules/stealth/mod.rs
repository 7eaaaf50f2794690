//! Anti-fingerprinting payload for rendered sessions.
//!
//! The script is an externally-supplied, fixed countermeasure blob. The
//! orchestrator injects it opaquely once per browser session before the
//! first navigation and never inspects or varies it.

/// JavaScript evaluated on every new document in a rendered session.
pub const STEALTH_SCRIPT: &str = r#"
// === WEBDRIVER DETECTION BYPASS ===
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined
});

// === CHROME RUNTIME SPOOFING ===
window.chrome = {
    runtime: {},
    loadTimes: function() {},
    csi: function() {},
    app: {}
};

// === PERMISSIONS API ===
const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) => (
    parameters.name === 'notifications' ?
        Promise.resolve({ state: Notification.permission }) :
        originalQuery(parameters)
);

// === PLUGIN SPOOFING ===
Object.defineProperty(navigator, 'plugins', {
    get: () => [
        {
            0: {type: "application/x-google-chrome-pdf", suffixes: "pdf", description: "Portable Document Format"},
            description: "Portable Document Format",
            filename: "internal-pdf-viewer",
            length: 1,
            name: "Chrome PDF Plugin"
        },
        {
            0: {type: "application/pdf", suffixes: "pdf", description: ""},
            description: "",
            filename: "mhjfbmdgcfjbbpaeojofohoefgiehjai",
            length: 1,
            name: "Chrome PDF Viewer"
        },
        {
            0: {type: "application/x-nacl", suffixes: "", description: "Native Client Executable"},
            1: {type: "application/x-pnacl", suffixes: "", description: "Portable Native Client Executable"},
            description: "",
            filename: "internal-nacl-plugin",
            length: 2,
            name: "Native Client"
        }
    ]
});

// === LANGUAGES ===
Object.defineProperty(navigator, 'languages', {
    get: () => ['en-US', 'en']
});

// === CANVAS FINGERPRINT RANDOMIZATION ===
const getImageData = CanvasRenderingContext2D.prototype.getImageData;
CanvasRenderingContext2D.prototype.getImageData = function() {
    const imageData = getImageData.apply(this, arguments);
    for (let i = 0; i < imageData.data.length; i += 4) {
        imageData.data[i] += Math.random() * 0.1 - 0.05;
    }
    return imageData;
};

// === WEBGL FINGERPRINT SPOOFING ===
const getParameter = WebGLRenderingContext.prototype.getParameter;
WebGLRenderingContext.prototype.getParameter = function(parameter) {
    if (parameter === 37445) {
        return 'Intel Inc.';
    }
    if (parameter === 37446) {
        return 'Intel Iris OpenGL Engine';
    }
    return getParameter.apply(this, arguments);
};

// === BATTERY API ===
Object.defineProperty(navigator, 'getBattery', {
    get: () => undefined
});

// === MEDIA DEVICES ===
if (navigator.mediaDevices && navigator.mediaDevices.enumerateDevices) {
    navigator.mediaDevices.enumerateDevices = () => Promise.resolve([
        {deviceId: "default", kind: "audioinput", label: "", groupId: ""},
        {deviceId: "default", kind: "audiooutput", label: "", groupId: ""},
        {deviceId: "default", kind: "videoinput", label: "", groupId: ""}
    ]);
}

// === AUTOMATION DETECTION ===
window.document.documentElement.setAttribute('webdriver', 'false');

// === HEADLESS DETECTION BYPASS ===
Object.defineProperty(navigator, 'maxTouchPoints', {
    get: () => 1
});

// === CONNECTION API ===
Object.defineProperty(navigator, 'connection', {
    get: () => ({
        effectiveType: '4g',
        rtt: 50,
        downlink: 10,
        saveData: false
    })
});
"#;
