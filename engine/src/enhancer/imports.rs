//! Static simple-name → fully-qualified-name tables for external symbols

/// Types commonly referenced by generated tests but declared outside the
/// project under test.
const KNOWN_TYPES: &[(&str, &str)] = &[
    // java.util / java.io / java.time
    ("List", "java.util.List"),
    ("ArrayList", "java.util.ArrayList"),
    ("LinkedList", "java.util.LinkedList"),
    ("Map", "java.util.Map"),
    ("HashMap", "java.util.HashMap"),
    ("LinkedHashMap", "java.util.LinkedHashMap"),
    ("Set", "java.util.Set"),
    ("HashSet", "java.util.HashSet"),
    ("Collections", "java.util.Collections"),
    ("Arrays", "java.util.Arrays"),
    ("Optional", "java.util.Optional"),
    ("UUID", "java.util.UUID"),
    ("Stream", "java.util.stream.Stream"),
    ("IntStream", "java.util.stream.IntStream"),
    ("Collectors", "java.util.stream.Collectors"),
    ("File", "java.io.File"),
    ("IOException", "java.io.IOException"),
    ("InputStream", "java.io.InputStream"),
    ("ByteArrayInputStream", "java.io.ByteArrayInputStream"),
    ("ByteArrayOutputStream", "java.io.ByteArrayOutputStream"),
    ("Path", "java.nio.file.Path"),
    ("Paths", "java.nio.file.Paths"),
    ("Files", "java.nio.file.Files"),
    ("BigDecimal", "java.math.BigDecimal"),
    ("LocalDate", "java.time.LocalDate"),
    ("LocalDateTime", "java.time.LocalDateTime"),
    ("Instant", "java.time.Instant"),
    ("Duration", "java.time.Duration"),
    ("Clock", "java.time.Clock"),
    // java.awt
    ("Rectangle", "java.awt.Rectangle"),
    ("Color", "java.awt.Color"),
    ("BufferedImage", "java.awt.image.BufferedImage"),
    // JUnit 5
    ("Test", "org.junit.jupiter.api.Test"),
    ("BeforeEach", "org.junit.jupiter.api.BeforeEach"),
    ("AfterEach", "org.junit.jupiter.api.AfterEach"),
    ("BeforeAll", "org.junit.jupiter.api.BeforeAll"),
    ("AfterAll", "org.junit.jupiter.api.AfterAll"),
    ("DisplayName", "org.junit.jupiter.api.DisplayName"),
    ("Nested", "org.junit.jupiter.api.Nested"),
    ("ExtendWith", "org.junit.jupiter.api.extension.ExtendWith"),
    ("TempDir", "org.junit.jupiter.api.io.TempDir"),
    ("ParameterizedTest", "org.junit.jupiter.params.ParameterizedTest"),
    ("ValueSource", "org.junit.jupiter.params.provider.ValueSource"),
    ("Assertions", "org.junit.jupiter.api.Assertions"),
    // Mockito
    ("Mock", "org.mockito.Mock"),
    ("Spy", "org.mockito.Spy"),
    ("InjectMocks", "org.mockito.InjectMocks"),
    ("Captor", "org.mockito.Captor"),
    ("ArgumentCaptor", "org.mockito.ArgumentCaptor"),
    ("Mockito", "org.mockito.Mockito"),
    ("ArgumentMatchers", "org.mockito.ArgumentMatchers"),
    ("MockitoExtension", "org.mockito.junit.jupiter.MockitoExtension"),
    // Spring
    ("Component", "org.springframework.stereotype.Component"),
    ("Service", "org.springframework.stereotype.Service"),
    ("Repository", "org.springframework.stereotype.Repository"),
    ("Controller", "org.springframework.stereotype.Controller"),
    ("RestController", "org.springframework.web.bind.annotation.RestController"),
    ("Autowired", "org.springframework.beans.factory.annotation.Autowired"),
    // Lombok
    ("Data", "lombok.Data"),
    ("Builder", "lombok.Builder"),
    ("Getter", "lombok.Getter"),
    ("Setter", "lombok.Setter"),
    ("NoArgsConstructor", "lombok.NoArgsConstructor"),
    ("AllArgsConstructor", "lombok.AllArgsConstructor"),
    ("RequiredArgsConstructor", "lombok.RequiredArgsConstructor"),
    // iText 5
    ("Document", "com.itextpdf.text.Document"),
    ("DocumentException", "com.itextpdf.text.DocumentException"),
    ("PageSize", "com.itextpdf.text.PageSize"),
    ("BaseColor", "com.itextpdf.text.BaseColor"),
    ("PdfWriter", "com.itextpdf.text.pdf.PdfWriter"),
    ("PdfReader", "com.itextpdf.text.pdf.PdfReader"),
    ("PdfStamper", "com.itextpdf.text.pdf.PdfStamper"),
    ("PdfContentByte", "com.itextpdf.text.pdf.PdfContentByte"),
    ("PdfImportedPage", "com.itextpdf.text.pdf.PdfImportedPage"),
    // java-diff-utils
    ("DiffUtils", "com.github.difflib.DiffUtils"),
    ("Patch", "com.github.difflib.patch.Patch"),
    ("AbstractDelta", "com.github.difflib.patch.AbstractDelta"),
    ("Delta", "com.github.difflib.patch.Delta"),
    ("Chunk", "com.github.difflib.patch.Chunk"),
];

/// Statically imported helpers: method name → class to import statically.
const STATIC_HELPERS: &[(&str, &str)] = &[
    ("assertEquals", "org.junit.jupiter.api.Assertions"),
    ("assertNotEquals", "org.junit.jupiter.api.Assertions"),
    ("assertTrue", "org.junit.jupiter.api.Assertions"),
    ("assertFalse", "org.junit.jupiter.api.Assertions"),
    ("assertNull", "org.junit.jupiter.api.Assertions"),
    ("assertNotNull", "org.junit.jupiter.api.Assertions"),
    ("assertSame", "org.junit.jupiter.api.Assertions"),
    ("assertThrows", "org.junit.jupiter.api.Assertions"),
    ("assertDoesNotThrow", "org.junit.jupiter.api.Assertions"),
    ("assertArrayEquals", "org.junit.jupiter.api.Assertions"),
    ("assertAll", "org.junit.jupiter.api.Assertions"),
    ("fail", "org.junit.jupiter.api.Assertions"),
    ("mock", "org.mockito.Mockito"),
    ("spy", "org.mockito.Mockito"),
    ("when", "org.mockito.Mockito"),
    ("verify", "org.mockito.Mockito"),
    ("times", "org.mockito.Mockito"),
    ("never", "org.mockito.Mockito"),
    ("doNothing", "org.mockito.Mockito"),
    ("doThrow", "org.mockito.Mockito"),
    ("doReturn", "org.mockito.Mockito"),
    ("verifyNoInteractions", "org.mockito.Mockito"),
    ("any", "org.mockito.ArgumentMatchers"),
    ("anyString", "org.mockito.ArgumentMatchers"),
    ("anyInt", "org.mockito.ArgumentMatchers"),
    ("anyLong", "org.mockito.ArgumentMatchers"),
    ("anyList", "org.mockito.ArgumentMatchers"),
    ("eq", "org.mockito.ArgumentMatchers"),
];

/// Fully-qualified name for a well-known external type.
pub fn known_type(simple_name: &str) -> Option<&'static str> {
    KNOWN_TYPES
        .iter()
        .find(|(name, _)| *name == simple_name)
        .map(|(_, fqn)| *fqn)
}

/// Class to statically import for a well-known helper method.
pub fn static_helper(method: &str) -> Option<&'static str> {
    STATIC_HELPERS
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, class)| *class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_type() {
        assert_eq!(known_type("InjectMocks"), Some("org.mockito.InjectMocks"));
        assert_eq!(known_type("PdfContentByte"), Some("com.itextpdf.text.pdf.PdfContentByte"));
        assert_eq!(known_type("Foo"), None);
    }

    #[test]
    fn test_static_helper() {
        assert_eq!(static_helper("assertThrows"), Some("org.junit.jupiter.api.Assertions"));
        assert_eq!(static_helper("anyString"), Some("org.mockito.ArgumentMatchers"));
        assert_eq!(static_helper("placeOrder"), None);
    }

    #[test]
    fn test_tables_have_unique_keys() {
        let mut names: Vec<&str> = KNOWN_TYPES.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
